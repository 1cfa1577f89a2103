//! clipforge-cli: the operator-facing entry point (§6, §10 "CLI").
//!
//! Exit codes:
//!   0   success
//!   2   configuration error (bad/missing environment variable)
//!   3   unrecoverable runtime error
//!   130 terminated by SIGINT/SIGTERM (`run-loop` only; it otherwise never
//!       returns on its own)

use clap::{Parser, Subcommand};
use clipforge_domain::ItemId;
use clipforge_supervisor::config::Settings;
use clipforge_supervisor::Supervisor;

const EXIT_SUCCESS: i32 = 0;
const EXIT_CONFIG_ERROR: i32 = 2;
const EXIT_RUNTIME_ERROR: i32 = 3;
const EXIT_SIGNALED: i32 = 130;

#[derive(Parser)]
#[command(name = "clipforge", about = "Autonomous short-form-video content pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile startup state, run one discovery tick, drain, and exit.
    RunOnce,
    /// Run continuously until SIGINT/SIGTERM.
    RunLoop,
    /// Re-enter an item at `approved`, discarding its failed/retrying tail.
    Reset { item_id: String },
    /// Print a JSON health snapshot (item counts by state, circuit breakers).
    Status,
    /// Run one retention garbage-collection sweep and exit.
    Gc,
}

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}

async fn run() -> i32 {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let _log_guard = match clipforge_supervisor::logging::init(&settings.log_dir(), "info") {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            None
        }
    };

    let cli = Cli::parse();

    let supervisor = match Supervisor::bootstrap(settings).await {
        Ok(supervisor) => supervisor,
        Err(err) => {
            tracing::error!(%err, "failed to bootstrap supervisor");
            return EXIT_RUNTIME_ERROR;
        }
    };

    match cli.command {
        Command::RunOnce => match supervisor.run_once().await {
            Ok(()) => EXIT_SUCCESS,
            Err(err) => {
                tracing::error!(%err, "run-once failed");
                EXIT_RUNTIME_ERROR
            }
        },
        Command::RunLoop => match supervisor.run_loop().await {
            Ok(()) => EXIT_SIGNALED,
            Err(err) => {
                tracing::error!(%err, "run-loop failed");
                EXIT_RUNTIME_ERROR
            }
        },
        Command::Reset { item_id } => match supervisor.reset_item(&ItemId::new(item_id)).await {
            Ok(()) => EXIT_SUCCESS,
            Err(err) => {
                eprintln!("reset failed: {err}");
                EXIT_RUNTIME_ERROR
            }
        },
        Command::Status => match supervisor.status().await {
            Ok(snapshot) => {
                match serde_json::to_string_pretty(&snapshot) {
                    Ok(json) => println!("{json}"),
                    Err(err) => {
                        eprintln!("failed to serialize status: {err}");
                        return EXIT_RUNTIME_ERROR;
                    }
                }
                EXIT_SUCCESS
            }
            Err(err) => {
                eprintln!("status failed: {err}");
                EXIT_RUNTIME_ERROR
            }
        },
        Command::Gc => {
            let collected = supervisor.gc_once().await;
            println!("collected {collected} item(s)");
            EXIT_SUCCESS
        }
    }
}
