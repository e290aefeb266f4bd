use std::{fmt::Write, sync::Arc};

use ::log::info;
use liftlog_domain::{self as domain, ExerciseService, HistoryService, RoutineService};

use crate::{command::Command, log};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("exercise {0} is not in the library")]
    UnknownExercise(domain::ExerciseID),
    #[error(transparent)]
    InvalidName(#[from] domain::NameError),
    #[error(transparent)]
    Workout(#[from] domain::WorkoutError),
    #[error(transparent)]
    Completion(#[from] domain::CompletionError),
    #[error(transparent)]
    Read(#[from] domain::ReadError),
    #[error("failed to read log: {0}")]
    Log(#[from] log::Error),
}

/// The interactive front end of a single workout.
pub struct App<S> {
    session: domain::WorkoutSession<S>,
    catalog: Vec<domain::ExerciseRef>,
    save_routine: bool,
    log: Arc<dyn log::Repository>,
}

impl<S> App<S> {
    pub fn new(
        session: domain::WorkoutSession<S>,
        save_routine: bool,
        log: Arc<dyn log::Repository>,
    ) -> Self {
        Self {
            session,
            catalog: vec![],
            save_routine,
            log,
        }
    }

    pub fn session(&self) -> &domain::WorkoutSession<S> {
        &self.session
    }

    pub fn tick(&mut self) {
        self.session.tick();
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(
            self.session.completion_state(),
            domain::CompletionState::Done(_)
        )
    }

    fn exercise(&self, exercise_id: domain::ExerciseID) -> Result<&domain::ExerciseRef, AppError> {
        self.catalog
            .iter()
            .find(|e| e.id == exercise_id)
            .ok_or(AppError::UnknownExercise(exercise_id))
    }

    fn show(&self) -> String {
        let mut output = format!(
            "{} | {} sets done | {} reps | {} kg",
            self.session.timer(),
            self.session.completed_sets(),
            self.session.total_reps(),
            self.session.total_weight()
        );
        if let Some(routine) = self.session.routine() {
            let _ = write!(output, " | {}", routine.name);
            if self.session.is_modified() {
                output.push_str(" (modified)");
            }
        }
        if self.session.blocks().is_empty() {
            output.push_str("\nno exercises, add one with \"add EXERCISE\"");
        }
        for block in self.session.blocks() {
            output.push('\n');
            output.push_str(&render_block(block));
        }
        output
    }
}

impl<S: ExerciseService + HistoryService + RoutineService> App<S> {
    /// Load the exercise library and start the workout from a routine or a list of exercises.
    pub async fn start(
        &mut self,
        routine_id: Option<domain::RoutineID>,
        exercise_ids: &[domain::ExerciseID],
    ) -> Result<String, AppError> {
        self.catalog = self.session.service().get_exercises().await?;

        if let Some(routine_id) = routine_id {
            let routine = self.session.service().get_routine(routine_id).await?;
            info!("starting routine {}", routine.name);
            self.session.load_routine(routine, &self.catalog).await;
        } else if exercise_ids.is_empty() {
            self.session.load_session(None).await;
        } else {
            let plan = exercise_ids
                .iter()
                .map(|id| self.exercise(*id).cloned())
                .collect::<Result<Vec<_>, _>>()?;
            self.session.load_session(Some(plan.as_slice())).await;
        }

        Ok(self.show())
    }

    pub async fn execute(&mut self, command: Command) -> Result<String, AppError> {
        match command {
            Command::Catalog { category, query } => {
                let exercises =
                    domain::search(&self.catalog, &query.join(" "), category.as_deref());
                if exercises.is_empty() {
                    return Ok(String::from("no exercises found"));
                }
                Ok(exercises
                    .iter()
                    .map(|e| render_exercise(e))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Command::AddExercise { exercise } => {
                let exercise = self.exercise(exercise.into())?.clone();
                self.session.add_exercise(exercise).await?;
                Ok(self.show())
            }
            Command::RemoveExercise { exercise } => {
                self.session.remove_exercise(exercise.into())?;
                Ok(self.show())
            }
            Command::AddSet { exercise } => {
                Ok(render_block(self.session.add_set(exercise.into())?))
            }
            Command::RemoveSet { exercise, set } => {
                Ok(render_block(self.session.remove_set(exercise.into(), set)?))
            }
            Command::Reps {
                exercise,
                set,
                value,
            } => Ok(render_set(self.session.update_set_field(
                exercise.into(),
                set,
                domain::SetField::Reps,
                &value,
            )?)),
            Command::Weight {
                exercise,
                set,
                value,
            } => Ok(render_set(self.session.update_set_field(
                exercise.into(),
                set,
                domain::SetField::Weight,
                &value,
            )?)),
            Command::Done { exercise, set } => {
                let exercise_id = exercise.into();
                let achieved = self.session.toggle_set_done(exercise_id, set)?;
                let block = self
                    .session
                    .block(exercise_id)
                    .ok_or(domain::WorkoutError::UnknownExercise(exercise_id))?;
                let mut output = render_block(block);
                if achieved && let Some(pr) = self.session.achieved_pr(exercise_id) {
                    let _ = write!(output, "\n{}", render_pr("New record! ", pr));
                }
                Ok(output)
            }
            Command::Acknowledge { exercise, set } => {
                self.session.clear_transient_flag(exercise.into(), set)?;
                Ok(self.show())
            }
            Command::Show => Ok(self.show()),
            Command::Finish { save } => {
                self.finish(domain::FinishRequest {
                    save_routine: save || self.save_routine,
                    decision: None,
                })
                .await
            }
            Command::Update => self.decide(domain::RoutineDecision::Update).await,
            Command::SaveAs { name } => {
                let name = domain::Name::new(&name.join(" "))?;
                self.decide(domain::RoutineDecision::SaveAsNew(name)).await
            }
            Command::Discard => self.decide(domain::RoutineDecision::Discard).await,
            Command::History => {
                let histories = self
                    .session
                    .service()
                    .get_workout_histories(self.session.profile_id())
                    .await?;
                if histories.is_empty() {
                    return Ok(String::from("no workouts yet"));
                }
                Ok(histories
                    .iter()
                    .map(render_history)
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Command::Log => Ok(self
                .log
                .read_entries()?
                .iter()
                .rev()
                .map(|e| format!("{} {:<5} {}", e.time, e.level, e.message))
                .collect::<Vec<_>>()
                .join("\n")),
            Command::Quit => Ok(String::new()),
        }
    }

    async fn decide(&mut self, decision: domain::RoutineDecision) -> Result<String, AppError> {
        self.finish(domain::FinishRequest {
            save_routine: true,
            decision: Some(decision),
        })
        .await
    }

    async fn finish(&mut self, request: domain::FinishRequest) -> Result<String, AppError> {
        match self.session.finish(request).await {
            Ok(summary) => Ok(render_summary(&summary)),
            Err(domain::CompletionError::DecisionRequired(prompt)) => Ok(match prompt {
                domain::RoutinePrompt::UpdateOrSaveAsNew => String::from(
                    "the routine was changed: \"update\", \"save-as NAME\" or \"discard\"",
                ),
                domain::RoutinePrompt::SaveAsNew => {
                    String::from("save as routine: \"save-as NAME\" or \"discard\"")
                }
            }),
            Err(err) => Err(err.into()),
        }
    }
}

fn render_exercise(exercise: &domain::ExerciseRef) -> String {
    let details = [exercise.category.as_deref(), exercise.equipment.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();
    if details.is_empty() {
        format!("{:>4}  {}", exercise.id, exercise.name)
    } else {
        format!(
            "{:>4}  {} ({})",
            exercise.id,
            exercise.name,
            details.join(", ")
        )
    }
}

fn render_block(block: &domain::ExerciseBlock) -> String {
    let mut output = format!(
        "{} [{}] {}/{}",
        block.exercise.name,
        block.exercise.id,
        block.completed_sets(),
        block.sets.len()
    );
    for set in &block.sets {
        output.push('\n');
        output.push_str(&render_set(set));
    }
    output
}

fn render_set(set: &domain::SetEntry) -> String {
    let reps = if set.reps.is_unset() {
        String::from("-")
    } else {
        set.reps.to_string()
    };
    let weight = if set.weight.is_unset() {
        String::from("-")
    } else {
        set.weight.to_string()
    };
    let mut output = format!(
        "  {:>2}  [{}] {:>4} reps {:>6} kg",
        set.set_number,
        if set.done { "x" } else { " " },
        reps,
        weight
    );
    if let (Some(reps), Some(weight)) = (set.previous_reps, set.previous_weight) {
        let _ = write!(output, "  last {reps} x {weight}");
    }
    if set.is_pr {
        output.push_str("  PR");
    }
    if set.just_achieved {
        output.push('!');
    }
    output
}

fn render_pr(prefix: &str, pr: &domain::AchievedPR) -> String {
    if pr.previous_weight.is_unset() {
        format!("{prefix}{}: {} kg", pr.exercise_name, pr.new_weight)
    } else {
        format!(
            "{prefix}{}: {} kg (previous {} kg)",
            pr.exercise_name, pr.new_weight, pr.previous_weight
        )
    }
}

fn render_summary(summary: &domain::CompletionSummary) -> String {
    let mut output = format!(
        "Workout complete: {} ({})\n{} exercises | {} sets | {} reps | {} kg",
        summary.workout_name,
        domain::ElapsedTimer::from_seconds(summary.duration),
        summary.exercises,
        summary.sets,
        summary.total_reps,
        summary.weight_lifted
    );
    for pr in &summary.prs {
        output.push('\n');
        output.push_str(&render_pr("New record: ", pr));
    }
    output
}

fn render_history(history: &domain::WorkoutHistory) -> String {
    let mut output = format!(
        "{:>4}  {}  {} min",
        history.id,
        history.completed_at.format("%Y-%m-%d %H:%M"),
        history.duration_minutes
    );
    if let Some(workout_id) = history.workout_id {
        let _ = write!(output, "  routine {workout_id}");
    }
    output
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use liftlog_storage::memory::InMemory;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::command;

    type TestApp = App<domain::Service<InMemory>>;

    fn profile() -> domain::ProfileID {
        domain::ProfileID::from(1)
    }

    fn catalog() -> Vec<domain::ExerciseRef> {
        vec![
            domain::ExerciseRef {
                id: 1.into(),
                name: String::from("Squat"),
                category: Some(String::from("Legs")),
                equipment: Some(String::from("Barbell")),
            },
            domain::ExerciseRef {
                id: 2.into(),
                name: String::from("Bench Press"),
                category: Some(String::from("Chest")),
                equipment: None,
            },
        ]
    }

    /// One previous workout with a single bench press set of 5 x 100.
    async fn repository() -> InMemory {
        use domain::HistoryRepository;

        let repository = InMemory::new(catalog());
        let id = repository
            .create_workout_history(domain::NewWorkoutHistory {
                profile_id: profile(),
                workout_id: None,
                duration_minutes: 40,
                completed_at: chrono::DateTime::UNIX_EPOCH,
            })
            .await
            .unwrap();
        repository
            .create_set_records(vec![domain::SetRecord {
                profile_id: profile(),
                workout_history_id: id,
                exercise_id: 2.into(),
                set_number: 1,
                reps: domain::Reps::new(5),
                weight: domain::Weight::from(100),
            }])
            .await
            .unwrap();
        repository
    }

    async fn app(exercise_ids: &[u32]) -> TestApp {
        let mut app = App::new(
            domain::WorkoutSession::new(domain::Service::new(repository().await), profile()),
            false,
            Arc::new(log::Buffer::default()),
        );
        let ids = exercise_ids
            .iter()
            .map(|id| domain::ExerciseID::from(*id))
            .collect::<Vec<_>>();
        app.start(None, &ids).await.unwrap();
        app
    }

    async fn run(app: &mut TestApp, line: &str) -> Result<String, AppError> {
        app.execute(command::parse(line).unwrap()).await
    }

    async fn complete_squat(app: &mut TestApp) {
        for set in 1..=3 {
            run(app, &format!("reps 1 {set} 5")).await.unwrap();
            run(app, &format!("weight 1 {set} 60")).await.unwrap();
            run(app, &format!("done 1 {set}")).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_start() {
        let mut app = app(&[1, 2]).await;

        assert_eq!(
            run(&mut app, "show").await.unwrap(),
            [
                "00:00 | 0 sets done | 0 reps | 0 kg",
                "Squat [1] 0/3",
                "   1  [ ]    - reps      - kg",
                "   2  [ ]    - reps      - kg",
                "   3  [ ]    - reps      - kg",
                "Bench Press [2] 0/1",
                "   1  [ ]    - reps      - kg  last 5 x 100",
            ]
            .join("\n")
        );
    }

    #[tokio::test]
    async fn test_start_unknown_exercise() {
        let mut app = App::new(
            domain::WorkoutSession::new(domain::Service::new(repository().await), profile()),
            false,
            Arc::new(log::Buffer::default()),
        );
        assert!(matches!(
            app.start(None, &[9.into()]).await,
            Err(AppError::UnknownExercise(id)) if id == 9.into()
        ));
    }

    #[tokio::test]
    async fn test_catalog() {
        let mut app = app(&[]).await;

        assert_eq!(
            run(&mut app, "catalog").await.unwrap(),
            "   2  Bench Press (Chest)\n   1  Squat (Legs, Barbell)"
        );
        assert_eq!(
            run(&mut app, "catalog -c legs").await.unwrap(),
            "   1  Squat (Legs, Barbell)"
        );
        assert_eq!(
            run(&mut app, "catalog deadlift").await.unwrap(),
            "no exercises found"
        );
    }

    #[tokio::test]
    async fn test_add_exercise_toggles() {
        let mut app = app(&[]).await;

        run(&mut app, "add 2").await.unwrap();
        assert_eq!(app.session().exercise_ids(), vec![2.into()]);

        run(&mut app, "add 2").await.unwrap();
        assert!(app.session().blocks().is_empty());

        assert!(matches!(
            run(&mut app, "add 7").await,
            Err(AppError::UnknownExercise(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_sets() {
        let mut app = app(&[1]).await;

        assert_eq!(
            run(&mut app, "reps 1 2 8x").await.unwrap(),
            "   2  [ ]    8 reps      - kg"
        );
        run(&mut app, "remove-set 1 1").await.unwrap();
        assert_eq!(
            run(&mut app, "add-set 1").await.unwrap(),
            [
                "Squat [1] 0/3",
                "   1  [ ]    8 reps      - kg",
                "   2  [ ]    - reps      - kg",
                "   3  [ ]    - reps      - kg",
            ]
            .join("\n")
        );
        assert!(matches!(
            run(&mut app, "done 1 4").await,
            Err(AppError::Workout(domain::WorkoutError::UnknownSet { .. }))
        ));
    }

    #[tokio::test]
    async fn test_new_record() {
        let mut app = app(&[2]).await;

        run(&mut app, "weight 2 1 105").await.unwrap();
        assert_eq!(
            run(&mut app, "done 2 1").await.unwrap(),
            [
                "Bench Press [2] 1/1",
                "   1  [x]    - reps    105 kg  last 5 x 100  PR!",
                "New record! Bench Press: 105 kg (previous 100 kg)",
            ]
            .join("\n")
        );

        run(&mut app, "ack 2 1").await.unwrap();
        assert!(!app.session().blocks()[0].sets[0].just_achieved);
        assert!(app.session().blocks()[0].sets[0].is_pr);
    }

    #[tokio::test]
    async fn test_finish_blocked() {
        let mut app = app(&[1]).await;

        assert!(matches!(
            run(&mut app, "finish").await,
            Err(AppError::Completion(domain::CompletionError::Blocked(
                domain::CompletionBlocker::IncompleteSets
            )))
        ));
        assert!(!app.is_done());
    }

    #[tokio::test]
    async fn test_finish() {
        let mut app = app(&[1]).await;
        complete_squat(&mut app).await;

        assert_eq!(
            run(&mut app, "finish").await.unwrap(),
            [
                "Workout complete: Workout (00:00)",
                "1 exercises | 3 sets | 15 reps | 900 kg",
                "New record: Squat: 60 kg",
            ]
            .join("\n")
        );
        assert!(app.is_done());

        let history = run(&mut app, "history").await.unwrap();
        assert_eq!(history.lines().count(), 2);
        assert!(history.starts_with("   2  "));
    }

    #[tokio::test]
    async fn test_finished_workout_is_read_only() {
        let mut app = app(&[1]).await;
        complete_squat(&mut app).await;
        run(&mut app, "finish").await.unwrap();

        for line in ["add 2", "add-set 1", "reps 1 1 8", "done 1 1", "remove 1"] {
            assert!(matches!(
                run(&mut app, line).await,
                Err(AppError::Workout(domain::WorkoutError::Completed))
            ));
        }
        assert_eq!(app.session().blocks()[0].completed_sets(), 3);
        assert!(run(&mut app, "show").await.is_ok());
    }

    #[tokio::test]
    async fn test_finish_save_as_routine() {
        let mut app = app(&[1]).await;
        complete_squat(&mut app).await;

        assert_eq!(
            run(&mut app, "finish --save").await.unwrap(),
            "save as routine: \"save-as NAME\" or \"discard\""
        );
        assert!(!app.is_done());

        assert!(
            run(&mut app, "save-as Leg Day")
                .await
                .unwrap()
                .starts_with("Workout complete: Leg Day")
        );
        let routine = app
            .session()
            .service()
            .get_routine(1.into())
            .await
            .unwrap();
        assert_eq!(routine.name.to_string(), "Leg Day");
        assert_eq!(routine.exercise_ids, vec![1.into()]);
    }

    #[tokio::test]
    async fn test_log() {
        let buffer = Arc::new(log::Buffer::default());
        for message in ["first", "second"] {
            log::Repository::write_entry(
                buffer.as_ref(),
                log::Entry {
                    time: String::from("Mar 02 18:00:00"),
                    level: ::log::Level::Warn,
                    message: message.to_string(),
                },
            )
            .unwrap();
        }
        let mut app: TestApp = App::new(
            domain::WorkoutSession::new(domain::Service::new(InMemory::default()), profile()),
            false,
            buffer,
        );

        assert_eq!(
            run(&mut app, "log").await.unwrap(),
            "Mar 02 18:00:00 WARN  first\nMar 02 18:00:00 WARN  second"
        );
        assert_eq!(
            log::Repository::read_entries(app.log.as_ref()).unwrap(),
            VecDeque::from([
                log::Entry {
                    time: String::from("Mar 02 18:00:00"),
                    level: ::log::Level::Warn,
                    message: String::from("second"),
                },
                log::Entry {
                    time: String::from("Mar 02 18:00:00"),
                    level: ::log::Level::Warn,
                    message: String::from("first"),
                },
            ])
        );
    }
}
