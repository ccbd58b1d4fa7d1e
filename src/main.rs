pub mod app;
pub mod config;
pub mod console;
pub mod controller;
pub mod dlp;
pub mod session;

use crate::app::AppSettings;
use crate::config::Config;
use crate::console::LogConsole;
use crate::controller::GamepadInput;
use crate::dlp::{DistributionServer, SimulatedServer};
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = Config::load().map_err(|e| eyre!("Failed to load config: {}", e))?;
    let settings =
        AppSettings::try_from(&config).map_err(|e| eyre!("Failed to load config: {}", e))?;
    info!("Starting distribution demo with {:?}", config);

    let console = LogConsole::new(config.console.max_lines);
    let server: Arc<dyn DistributionServer> =
        Arc::new(SimulatedServer::new(config.simulator_settings()));

    let shutdown = CancellationToken::new();
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Unable to listen for Ctrl-C: {}", e);
                    return;
                }
                info!("Ctrl-C received, shutting down");
                ctrl_c_shutdown.cancel();
            }
            _ = ctrl_c_shutdown.cancelled() => {}
        }
    });

    let gamepad_index = config.input.gamepad_index;
    let frame_interval = Duration::from_millis(config.input.frame_interval_ms);
    app::run(
        server,
        console,
        move || GamepadInput::new(gamepad_index, frame_interval),
        std::io::stdout(),
        settings,
        shutdown,
    )
    .await;

    info!("Demo finished");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

// Logs go to stderr; stdout belongs to the console repaint.
fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .pretty()
        .init();
}
