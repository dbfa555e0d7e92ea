//! Operator CLI front end (C13, §4.13/§6a). A thin wrapper over the C9 orchestrator
//! API — no validation, authentication, or HTTP handling of its own.

use std::path::PathBuf;
use std::sync::Arc;

use aps_engine::model::{SchedulingFlags, SchedulingTask, TaskStatus};
use aps_engine::orchestrator::TaskFilter;
use aps_engine::{initialize_database, Database, Orchestrator, PipelineConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aps-cli", about = "Operator CLI for the Advanced Planning & Scheduling engine")]
struct Cli {
    /// Path to the SQLite database file. Defaults to `aps_engine.db` in the current directory.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a scheduling task for a decade-plan batch.
    Start {
        #[arg(long)]
        batch: String,
        #[arg(long)]
        no_merge: bool,
        #[arg(long)]
        no_split: bool,
        #[arg(long)]
        no_correction: bool,
        #[arg(long)]
        no_parallel: bool,
        #[arg(long)]
        force_rerun: bool,
    },
    /// Print a task's current state as JSON.
    Status {
        #[arg(long)]
        task: String,
    },
    /// Signal cooperative cancellation for a running task.
    Cancel {
        #[arg(long)]
        task: String,
    },
    /// List tasks, optionally filtered by batch or status.
    List {
        #[arg(long)]
        batch: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(Database::default_path);

    let db = match initialize_database(&db_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            eprintln!("failed to open database at {}: {e}", db_path.display());
            std::process::exit(1);
        }
    };

    let orchestrator = Orchestrator::new(db, PipelineConfig::default());

    let exit_code = match cli.command {
        Command::Start {
            batch,
            no_merge,
            no_split,
            no_correction,
            no_parallel,
            force_rerun,
        } => {
            let flags = SchedulingFlags {
                merge_enabled: !no_merge,
                split_enabled: !no_split,
                correction_enabled: !no_correction,
                parallel_enabled: !no_parallel,
            };
            match orchestrator.start_task(&batch, flags, force_rerun).await {
                Ok(task_id) => {
                    println!("{task_id}");
                    0
                }
                Err(e) => {
                    eprintln!("{e}");
                    1
                }
            }
        }
        Command::Status { task } => print_task(orchestrator.get_task(&task)),
        Command::Cancel { task } => match orchestrator.cancel_task(&task) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("{e}");
                1
            }
        },
        Command::List { batch, status } => {
            let filter = TaskFilter {
                batch_id: batch,
                status: status.and_then(|s| TaskStatus::from_str(&s.to_uppercase()).ok()),
            };
            match orchestrator.list_tasks(&filter) {
                Ok(tasks) => {
                    println!("{}", serde_json::to_string_pretty(&tasks).unwrap());
                    0
                }
                Err(e) => {
                    eprintln!("{e}");
                    1
                }
            }
        }
    };

    std::process::exit(exit_code);
}

fn print_task(result: aps_engine::Result<SchedulingTask>) -> i32 {
    match result {
        Ok(task) => {
            println!("{}", serde_json::to_string_pretty(&task).unwrap());
            if task.status == TaskStatus::Failed { 1 } else { 0 }
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}
