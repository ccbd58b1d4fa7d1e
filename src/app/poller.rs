//! Background poll for server state changes

use crate::console::LogConsole;
use crate::dlp::{DistributionServer, DlpResult, PollMode, ResultCode, ServerState};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

/// What one poll found
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing changed since the last poll
    Unchanged,
    /// The poll itself failed
    Failed(ResultCode),
    /// The server state changed; carries the follow-up state query
    Changed(DlpResult<ServerState>),
}

pub struct StatePoller {
    server: Arc<dyn DistributionServer>,
    console: LogConsole,
}

impl StatePoller {
    pub fn new(server: Arc<dyn DistributionServer>, console: LogConsole) -> Self {
        Self { server, console }
    }

    /// Polls once without blocking
    ///
    /// [`ResultCode::NOT_FOUND`] is the idle answer and stays off the console.
    pub fn poll_once(&self) -> PollOutcome {
        match self.server.poll_state_change(PollMode::NonBlocking) {
            Err(ResultCode::NOT_FOUND) => {
                trace!("No state change");
                PollOutcome::Unchanged
            }
            Err(code) => {
                self.console.print_failure("PollStateChange", code);
                PollOutcome::Failed(code)
            }
            Ok(()) => {
                self.console.print("Successfully polled!");
                let state = self.server.get_internal_state();
                match state {
                    Ok(state) => self
                        .console
                        .print(format!("Polled server state: {}", state)),
                    Err(code) => self.console.print_failure("GetInternalState", code),
                }
                PollOutcome::Changed(state)
            }
        }
    }
}

/// Polls every `interval` until shutdown is requested
pub fn run_poll_loop(poller: &StatePoller, shutdown: &CancellationToken, interval: Duration) {
    info!("Starting poll loop with {:?} interval", interval);
    while !shutdown.is_cancelled() {
        poller.poll_once();
        std::thread::sleep(interval);
    }
    info!("Poll loop finished");
}
