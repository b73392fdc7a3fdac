use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use smartlid_core::config::Backend;
use smartlid_core::hardware::simulated::SimulatedSensor;
use smartlid_core::{
    AlertEngine, Collaborators, Config, EngineSettings, LidState, LineMessaging, SystemClock,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info};

use super::{load_config, CmdResult, Hardware};

const STDIN_GRACE: Duration = Duration::from_millis(500);

pub fn run(config_path: Option<&Path>, simulate: bool) -> CmdResult {
    let config = load_config(config_path)?;
    let backend = if simulate {
        Backend::Simulated
    } else {
        config.hardware.backend
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(daemon(config, backend));
    // A console read may still be parked on stdin after a signal.
    runtime.shutdown_timeout(STDIN_GRACE);
    result
}

async fn daemon(config: Config, backend: Backend) -> CmdResult {
    let hardware = Hardware::open(&config, backend)?;
    let notifier = match LineMessaging::new(&config.line) {
        Ok(notifier) => notifier.with_summary_threshold(config.alert.daily_alert_threshold),
        Err(e) => {
            hardware.release();
            return Err(e.into());
        }
    };

    let collaborators = Collaborators {
        sensor: Arc::clone(&hardware.sensor),
        actuator: Arc::clone(&hardware.actuator),
        player: Arc::clone(&hardware.player),
        notifier: Arc::new(notifier),
        clock: Arc::new(SystemClock),
    };
    let engine = match AlertEngine::start(EngineSettings::from(&config), &collaborators) {
        Ok(engine) => engine,
        Err(e) => {
            collaborators.release();
            return Err(e.into());
        }
    };
    info!(backend = ?backend, "smartlid running");

    let outcome = match &hardware.simulated {
        Some(sensor) => {
            let printer = print_events(&engine);
            let outcome = console(&engine, sensor).await;
            engine.shutdown().await;
            let _ = printer.await;
            outcome
        }
        None => {
            shutdown_signal().await;
            engine.shutdown().await;
            Ok(())
        }
    };

    collaborators.release();
    outcome
}

/// Echo engine events to stdout as JSON lines.
fn print_events(engine: &AlertEngine) -> tokio::task::JoinHandle<()> {
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => println!("{json}"),
                    Err(e) => error!("cannot print event: {e}"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    error!("event printer fell behind, {n} events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Drive the simulated sensor from stdin until `quit`, EOF or a signal.
async fn console(engine: &AlertEngine, sensor: &SimulatedSensor) -> CmdResult {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let stop = shutdown_signal();
    tokio::pin!(stop);

    loop {
        tokio::select! {
            () = &mut stop => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "open" => sensor.set(LidState::Open),
                    "close" => sensor.set(LidState::Closed),
                    "status" => {
                        let snapshot = engine.snapshot().await?;
                        println!("{}", serde_json::to_string(&snapshot)?);
                    }
                    "quit" | "exit" => break,
                    "" => {}
                    other => eprintln!("unknown command: {other} (open, close, status, quit)"),
                }
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
