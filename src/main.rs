//! hive-cli
//!
//! Command-line front end for the hive task lifecycle engine.

use anyhow::Result;
use clap::Parser;
use hive_tasks::cli::project::ProjectCommand;
use hive_tasks::cli::{Cli, Command};
use hive_tasks::config::{ConfigLoader, StoreBackend};
use hive_tasks::error::HiveError;
use hive_tasks::format::{self, OutputFormat, to_json};
use hive_tasks::logging::{self, LogTarget};
use hive_tasks::service::TaskService;
use hive_tasks::store::{FileStore, SqliteStore, TaskStore};
use mockable::DefaultClock;
use serde::Serialize;
use serde_json::json;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json = cli.json;

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(err, json);
            ExitCode::FAILURE
        }
    }
}

/// Print an error: the structured body with `--json`, the message chain otherwise.
fn report_error(err: anyhow::Error, json: bool) {
    if json {
        let body = HiveError::from(err);
        match to_json(&body) {
            Ok(text) => println!("{}", text),
            Err(_) => eprintln!("Error: {}", body),
        }
    } else {
        eprintln!("Error: {:#}", err);
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut loader = ConfigLoader::load(cli.config.clone())?;
    for (tier, path) in loader.sources() {
        debug!(tier = %tier, path = %path.display(), "Config tier applied");
    }

    // Command-line overrides sit above every config tier.
    let config = loader.config_mut();
    if let Some(ref data_dir) = cli.data_dir {
        config.store.data_dir = data_dir.clone();
    }
    if let Some(ref agent) = cli.agent {
        config.agent = agent.clone();
    }
    let config = loader.into_config();
    let format = OutputFormat::from_flag(cli.json);

    match config.store.backend {
        StoreBackend::File => {
            let store = FileStore::open(&config.store.data_dir)?;
            info!(data_dir = %store.root().display(), "Using file store");
            dispatch(TaskService::new(store, DefaultClock, config), cli.command, format).await
        }
        StoreBackend::Sqlite => {
            std::fs::create_dir_all(&config.store.data_dir)?;
            let db_path = config.store.db_path();
            let store = SqliteStore::open(&db_path)?;
            info!(db_path = %db_path.display(), "Using SQLite store");
            dispatch(TaskService::new(store, DefaultClock, config), cli.command, format).await
        }
    }
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(value)?),
        OutputFormat::Text => print!("{}", text(value)),
    }
    Ok(())
}

async fn dispatch<S: TaskStore>(
    service: TaskService<S, DefaultClock>,
    command: Command,
    output: OutputFormat,
) -> Result<ExitCode> {
    match command {
        Command::Create(args) => {
            let task = service.create(args.into_request())?;
            emit(output, &task, format::format_created)?;
        }
        Command::List(args) => {
            let tasks = service.list(&args.into_filter()?)?;
            emit(output, &tasks, |t| format::format_task_list(t))?;
        }
        Command::Show { task_id } => {
            let detail = service.show(&task_id)?;
            emit(output, &detail, format::format_task_detail)?;
        }
        Command::Update(args) => {
            let (task_id, request) = args.into_request()?;
            let outcome = service.update(&task_id, request)?;
            emit(output, &outcome, format::format_update)?;
        }
        Command::Provide(args) => {
            let task = service.provide_input(&args.task_id, &args.input)?;
            emit(output, &task, |t| {
                format!("Unblocked task {} with provided input.\n", t.task_id)
            })?;
        }
        Command::Ready { agent_type } => {
            let tasks = service.list_ready(&agent_type)?;
            emit(output, &tasks, |t| format::format_task_list(t))?;
        }
        Command::Summary => {
            let summary = service.summary()?;
            emit(output, &summary, format::format_summary)?;
        }
        Command::Stranded => {
            let found = service.stranded()?;
            emit(output, &found, |f| format::format_stranded(f))?;
        }
        Command::Stale(args) => {
            let found = service.stale(args.threshold)?;
            emit(output, &found, |f| format::format_stale(f))?;
        }
        Command::Wait(args) => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let timeout = args.timeout.map(Duration::from_secs);
            let settlement = service.wait(&args.task_id, timeout, &cancel).await?;
            emit(output, &settlement, |s| format::format_settlement(&args.task_id, s))?;
            return Ok(ExitCode::from(u8::try_from(settlement.exit_code).unwrap_or(1)));
        }
        Command::Archive => {
            let archived = service.archive_terminal()?;
            emit(output, &json!({ "archived": &archived }), |_| {
                format!("Archived {} tasks.\n", archived.len())
            })?;
        }
        Command::Project(command) => match command {
            ProjectCommand::Create(args) => {
                let project = service.create_project(args.into_request())?;
                emit(output, &project, format::format_project)?;
            }
            ProjectCommand::Update(args) => {
                let (project_id, request) = args.into_request();
                let project = service.update_project(&project_id, request)?;
                emit(output, &project, |p| {
                    format!("Updated project {}: {} [{}]\n", p.project_id, p.title, p.status)
                })?;
            }
            ProjectCommand::List => {
                let projects = service.list_projects()?;
                emit(output, &projects, |p| format::format_project_list(p))?;
            }
            ProjectCommand::Show { project_id } => {
                let detail = service.show_project(&project_id)?;
                emit(output, &detail, format::format_project_detail)?;
            }
        },
    }
    Ok(ExitCode::SUCCESS)
}
