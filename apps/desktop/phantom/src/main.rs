use phantom::APP_DIR_NAME;
use phantom::connect::connect_with_retry;
use phantom::console::{ConsoleCommand, HELP};
use phantom::error::PhantomError;
use phantom::logger::{initialize as LoggerInitialize, log_file_path};
use phantom::panel::ControlPanel;

use client_core::broker::EventBroker;
use client_core::config::ClientConfig;
use client_core::store::{AlertStore, Runtime};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::ctrl_c as TokioCtrlC;
use tokio::task::{JoinError, JoinSet};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), PhantomError> {
    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();

    let config_dir = dirs::config_dir()
        .ok_or_else(|| PhantomError::Phantom {
            message: String::from("Failed to determine the config directory"),
            location: ErrorLocation::from(Location::caller()),
        })?
        .join(APP_DIR_NAME);
    let log_dir = config_dir.join("logs");

    create_dir_all(&log_dir).map_err(|e| PhantomError::Phantom {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&log_dir)?;

    info!("Phantom client starting");
    info!("Log file: {}", log_file_path(&log_dir).display());

    let mut config = ClientConfig::load(&config_dir)?;
    config.apply_env_override()?;

    let (bridge, events) = connect_with_retry(&config.ipc).await?;

    let runtime = Runtime::new(Arc::new(bridge), EventBroker::new(), AlertStore::new());
    let panel = ControlPanel::new(runtime.clone());

    // Routing first, then seed + ready.
    let mut pump = tokio::spawn(runtime.clone().pump(events));
    runtime.start().await?;

    if let Err(e) = panel.refresh_listeners().await {
        warn!("Failed to load listeners: {e}");
    }

    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // Each command runs on its own task; the loop keeps reading meanwhile.
    let mut running = JoinSet::new();
    let mut input_closed = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        input_closed = true;
                        break;
                    }
                    Err(e) => {
                        return Err(PhantomError::Phantom {
                            message: format!("Failed to read stdin: {e}"),
                            location: ErrorLocation::from(Location::caller()),
                        });
                    }
                };

                if line.trim().is_empty() {
                    continue;
                }

                let command = match line.parse::<ConsoleCommand>() {
                    Ok(command) => command,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };

                if command == ConsoleCommand::Quit {
                    break;
                }

                let panel = panel.clone();
                running.spawn(async move { panel.execute(command).await });
            }
            Some(finished) = running.join_next() => report(finished),
            _ = TokioCtrlC() => {
                info!("Interrupted");
                break;
            }
            _ = &mut pump => {
                warn!("Backend connection closed");
                break;
            }
        }
    }

    // Piped input: let the last commands finish before exiting.
    if input_closed {
        while let Some(finished) = running.join_next().await {
            report(finished);
        }
    }

    running.abort_all();
    pump.abort();
    info!("Phantom client exiting");
    Ok(())
}

fn report(finished: Result<Result<Option<String>, PhantomError>, JoinError>) {
    match finished {
        Ok(Ok(Some(output))) => println!("{output}"),
        Ok(Ok(None)) => {}
        Ok(Err(e)) => warn!("{e}"),
        Err(e) => error!("Console command task failed: {e}"),
    }
}
