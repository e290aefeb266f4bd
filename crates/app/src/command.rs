//! Commands of the interactive prompt.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(multicall = true)]
struct Prompt {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search the exercise library
    #[command(visible_alias = "c")]
    Catalog {
        /// Only exercises of this category
        #[arg(short, long)]
        category: Option<String>,

        /// Part of the exercise name
        query: Vec<String>,
    },

    /// Add an exercise, or remove it if already added
    #[command(name = "add", visible_alias = "a")]
    AddExercise { exercise: u32 },

    /// Remove an exercise
    #[command(name = "remove")]
    RemoveExercise { exercise: u32 },

    /// Append a set
    AddSet { exercise: u32 },

    /// Remove a set
    RemoveSet { exercise: u32, set: u32 },

    /// Enter the reps of a set
    Reps {
        exercise: u32,
        set: u32,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Enter the weight of a set
    Weight {
        exercise: u32,
        set: u32,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Toggle the completion of a set
    #[command(visible_alias = "d")]
    Done { exercise: u32, set: u32 },

    /// Acknowledge a new record
    #[command(name = "ack")]
    Acknowledge { exercise: u32, set: u32 },

    /// Show the workout
    #[command(visible_alias = "s")]
    Show,

    /// Finish the workout
    Finish {
        /// Save the exercises as a routine
        #[arg(short, long)]
        save: bool,
    },

    /// Update the loaded routine and finish
    Update,

    /// Save the routine under a new name and finish
    SaveAs {
        #[arg(required = true)]
        name: Vec<String>,
    },

    /// Finish without saving the routine
    Discard,

    /// List completed workouts
    History,

    /// Show recent log messages
    Log,

    /// Leave without saving
    #[command(visible_aliases = ["q", "exit"])]
    Quit,
}

/// Parse one prompt line. `help` and `<command> --help` are reported as
/// [`clap::error::ErrorKind::DisplayHelp`].
pub fn parse(line: &str) -> Result<Command, clap::Error> {
    Prompt::try_parse_from(line.split_whitespace()).map(|prompt| prompt.command)
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("catalog", Command::Catalog { category: None, query: vec![] })]
    #[case("catalog bench  press", Command::Catalog { category: None, query: vec![String::from("bench"), String::from("press")] })]
    #[case("c -c Legs squat", Command::Catalog { category: Some(String::from("Legs")), query: vec![String::from("squat")] })]
    #[case("add 4", Command::AddExercise { exercise: 4 })]
    #[case("a 4", Command::AddExercise { exercise: 4 })]
    #[case("remove 4", Command::RemoveExercise { exercise: 4 })]
    #[case("add-set 4", Command::AddSet { exercise: 4 })]
    #[case("remove-set 4 2", Command::RemoveSet { exercise: 4, set: 2 })]
    #[case("reps 4 1 8", Command::Reps { exercise: 4, set: 1, value: String::from("8") })]
    #[case("weight 4 1 102.5", Command::Weight { exercise: 4, set: 1, value: String::from("102.5") })]
    #[case("weight 4 1 -5", Command::Weight { exercise: 4, set: 1, value: String::from("-5") })]
    #[case("done 4 3", Command::Done { exercise: 4, set: 3 })]
    #[case("ack 4 3", Command::Acknowledge { exercise: 4, set: 3 })]
    #[case("  show ", Command::Show)]
    #[case("finish", Command::Finish { save: false })]
    #[case("finish --save", Command::Finish { save: true })]
    #[case("update", Command::Update)]
    #[case("save-as Push Day", Command::SaveAs { name: vec![String::from("Push"), String::from("Day")] })]
    #[case("discard", Command::Discard)]
    #[case("history", Command::History)]
    #[case("log", Command::Log)]
    #[case("q", Command::Quit)]
    fn test_parse(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(parse(line).unwrap(), expected);
    }

    #[rstest]
    #[case("jump", ErrorKind::InvalidSubcommand)]
    #[case("add", ErrorKind::MissingRequiredArgument)]
    #[case("add squat", ErrorKind::ValueValidation)]
    #[case("done 4", ErrorKind::MissingRequiredArgument)]
    #[case("reps 4 1", ErrorKind::MissingRequiredArgument)]
    #[case("save-as", ErrorKind::MissingRequiredArgument)]
    #[case("show all", ErrorKind::UnknownArgument)]
    #[case("finish now", ErrorKind::UnknownArgument)]
    #[case("help", ErrorKind::DisplayHelp)]
    #[case("done --help", ErrorKind::DisplayHelp)]
    fn test_parse_error(#[case] line: &str, #[case] expected: ErrorKind) {
        assert_eq!(parse(line).unwrap_err().kind(), expected);
    }
}
