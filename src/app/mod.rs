//! Demo orchestration
//!
//! ```text
//! bootstrap ──► ┌ input loop (gamepad ─► commands) ┐ ──► join ──► shutdown
//!               └ poll loop  (state changes)        ┘
//! ```
//!
//! Both loops run on their own blocking thread and share nothing but the service
//! handle and the console. They stop once the shutdown token is cancelled, by Ctrl-C
//! or the HOME button; teardown waits for both.

pub mod dispatcher;
pub mod poller;

pub use dispatcher::{run_input_loop, Command, CommandDispatcher};

use dispatcher::repaint;
pub use poller::{run_poll_loop, PollOutcome, StatePoller};

use crate::config::{Config, ConfigError};
use crate::console::LogConsole;
use crate::controller::{InputError, InputSource};
use crate::dlp::{DistributionParams, DistributionServer, SessionPolicy};
use crate::session::DlpSession;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Clone, Debug)]
pub struct AppSettings {
    pub params: DistributionParams,
    pub policy: SessionPolicy,
    pub poll_interval: Duration,
    pub exit_linger: Duration,
}

impl TryFrom<&Config> for AppSettings {
    type Error = ConfigError;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        Ok(Self {
            params: config.distribution_params()?,
            policy: config.session_policy(),
            poll_interval: config.poll_interval(),
            exit_linger: Duration::from_millis(config.console.exit_linger_ms),
        })
    }
}

/// Runs one distribution session from bootstrap to teardown
///
/// `make_input` is called on the input thread, so the input source itself does not
/// have to be `Send`. If it fails, the demo shuts down.
pub async fn run<F, I, W>(
    server: Arc<dyn DistributionServer>,
    console: LogConsole,
    make_input: F,
    mut screen: W,
    settings: AppSettings,
    shutdown: CancellationToken,
) where
    F: FnOnce() -> Result<I, InputError> + Send + 'static,
    I: InputSource,
    W: Write + Send + 'static,
{
    let session = DlpSession::create(server.clone(), console.clone())
        .bootstrap(&settings.params, settings.policy);

    let input_handle = {
        let mut dispatcher = CommandDispatcher::new(server.clone(), console.clone());
        let console = console.clone();
        let shutdown = shutdown.clone();
        let exit_linger = settings.exit_linger;
        tokio::task::spawn_blocking(move || match make_input() {
            Ok(mut input) => run_input_loop(
                &mut input,
                &mut dispatcher,
                &console,
                &shutdown,
                exit_linger,
                &mut screen,
            ),
            Err(e) => {
                console.print_failure("Gamepad initialization", &e);
                repaint(&console, &mut screen);
                shutdown.cancel();
            }
        })
    };

    let poll_handle = {
        let poller = StatePoller::new(server.clone(), console.clone());
        let shutdown = shutdown.clone();
        let interval = settings.poll_interval;
        tokio::task::spawn_blocking(move || run_poll_loop(&poller, &shutdown, interval))
    };

    let (input_result, poll_result) = tokio::join!(input_handle, poll_handle);
    if let Err(e) = input_result {
        error!("Input loop terminated abnormally: {}", e);
    }
    if let Err(e) = poll_result {
        error!("Poll loop terminated abnormally: {}", e);
    }

    let _closed = session.shutdown();
    info!("Session closed");
}
