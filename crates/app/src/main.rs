use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use liftlog_app::{
    app::App,
    command::{self, Command},
    log,
    settings::Settings,
};
use liftlog_domain::{self as domain, ExerciseService, HistoryService, RoutineService};
use liftlog_storage::{
    memory::InMemory,
    rest::{REST, ReqwestSendRequest},
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(author, version, about = "Log a strength workout and track personal records")]
struct Args {
    /// Settings file (JSON)
    #[arg(short, long, env = "LIFTLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Keep all data in a local JSON file instead of Supabase
    #[arg(short, long, value_name = "FILE")]
    memory: Option<PathBuf>,

    /// Start from a saved routine
    #[arg(short, long, conflicts_with = "exercises")]
    routine: Option<u32>,

    /// Start with these exercises (comma separated ids)
    #[arg(short, long, value_delimiter = ',')]
    exercises: Vec<u32>,

    /// Offer to save the routine when finishing
    #[arg(short, long)]
    save_routine: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;

    let buffer: Arc<dyn log::Repository> = Arc::new(log::Buffer::default());
    log::init(buffer.clone(), settings.log_level)?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(&args, &settings, buffer))
}

async fn run(args: &Args, settings: &Settings, buffer: Arc<dyn log::Repository>) -> Result<()> {
    let save_routine = args.save_routine || settings.save_routine;

    if let Some(path) = &args.memory {
        let repository = if path.exists() {
            InMemory::from_json(&fs::read_to_string(path)?)
                .with_context(|| format!("invalid state file {}", path.display()))?
        } else {
            InMemory::default()
        };
        let session =
            domain::WorkoutSession::new(domain::Service::new(repository), settings.profile_id);
        let mut app = App::new(session, save_routine, buffer);
        interact(&mut app, args, |app| save_state(app, path)).await?;
        save_state(&app, path)
    } else {
        let remote = settings.remote().context(
            "no backend configured: set LIFTLOG_SUPABASE_URL and LIFTLOG_SUPABASE_KEY or use --memory",
        )?;
        if settings.profile_id.is_nil() {
            anyhow::bail!("no profile configured: set LIFTLOG_PROFILE_ID");
        }
        let sender = ReqwestSendRequest::new(remote.url, remote.api_key, remote.access_token);
        let session = domain::WorkoutSession::new(
            domain::Service::new(REST::new(sender)),
            settings.profile_id,
        );
        let mut app = App::new(session, save_routine, buffer);
        interact(&mut app, args, |_| Ok(())).await
    }
}

fn save_state(app: &App<domain::Service<InMemory>>, path: &Path) -> Result<()> {
    let json = app.session().service().repository().to_json()?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Read commands from stdin until quit or end of input, advancing the timer every second.
async fn interact<S, F>(app: &mut App<S>, args: &Args, on_finish: F) -> Result<()>
where
    S: ExerciseService + HistoryService + RoutineService,
    F: Fn(&App<S>) -> Result<()>,
{
    let routine = args.routine.map(domain::RoutineID::from);
    let exercises = args
        .exercises
        .iter()
        .map(|id| domain::ExerciseID::from(*id))
        .collect::<Vec<_>>();
    let overview = app
        .start(routine, &exercises)
        .await
        .map_err(|err| anyhow::anyhow!("failed to start workout: {err}"))?;
    println!("{overview}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => app.tick(),
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => command,
                    Err(err) => {
                        let _ = err.print();
                        continue;
                    }
                };
                let was_done = app.is_done();
                match app.execute(command).await {
                    Ok(output) => println!("{output}"),
                    Err(err) => println!("error: {err}"),
                }
                if !was_done && app.is_done() {
                    on_finish(app)?;
                }
            }
        }
    }

    Ok(())
}
