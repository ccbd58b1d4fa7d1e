//! Distribution session lifecycle with statum
//!
//! ```text
//! Bootstrapping ──bootstrap──► Serving ──shutdown──► Closed
//! ```
//!
//! Setup and teardown are best effort: a failing service call is reported on the
//! console and the lifecycle moves on regardless. Because `shutdown` consumes the
//! serving session, teardown runs exactly once, close before finalize.

use crate::console::LogConsole;
use crate::dlp::{DistributionParams, DistributionServer, SessionPolicy};
use statum::{machine, state};
use std::sync::Arc;
use tracing::{debug, info};

#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Bootstrapping,
    Serving,
    Closed,
}

#[machine]
pub struct DlpSession<S: SessionState> {
    server: Arc<dyn DistributionServer>,
    console: LogConsole,
}

impl DlpSession<Bootstrapping> {
    pub fn create(server: Arc<dyn DistributionServer>, console: LogConsole) -> Self {
        debug!("Creating distribution session");
        Self::new(server, console)
    }

    /// Initializes the service and opens the session
    pub fn bootstrap(
        self,
        params: &DistributionParams,
        policy: SessionPolicy,
    ) -> DlpSession<Serving> {
        info!("Bootstrapping session with {:?} and {:?}", params, policy);

        match self.server.initialize(params) {
            Ok(duplicate_notice) => self
                .console
                .print(format!("Initialize success! dup: {}", duplicate_notice)),
            Err(code) => self.console.print_failure("Initialize", code),
        }

        match self.server.open_sessions(policy) {
            Ok(()) => self.console.print(format!(
                "Session opened for distribution! Distributing {:06x} as \"{}\"",
                params.unique_id, params.user_name
            )),
            Err(code) => self.console.print_failure("OpenSessions", code),
        }

        self.transition()
    }
}

impl DlpSession<Serving> {
    /// Closes the session and tears the service down
    pub fn shutdown(self) -> DlpSession<Closed> {
        info!("Shutting down distribution session");

        if let Err(code) = self.server.close_sessions() {
            self.console.print_failure("CloseSessions", code);
        }
        if let Err(code) = self.server.finalize() {
            self.console.print_failure("Finalize", code);
        }

        self.transition()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dlp::mock::{Call, MockServer, Op};
    use crate::dlp::ResultCode;

    fn session(mock: &Arc<MockServer>, console: &LogConsole) -> DlpSession<Bootstrapping> {
        let server: Arc<dyn DistributionServer> = mock.clone();
        DlpSession::create(server, console.clone())
    }

    #[test]
    fn bootstrap_initializes_then_opens() {
        let mock = Arc::new(MockServer::new());
        let console = LogConsole::new(16);

        let _serving = session(&mock, &console)
            .bootstrap(&DistributionParams::default(), SessionPolicy::default());

        assert_eq!(
            mock.calls(),
            vec![
                Call::Initialize,
                Call::OpenSessions(SessionPolicy {
                    manual_accept: true,
                    channel: 0,
                }),
            ]
        );
        assert_eq!(console.lines()[0], "Initialize success! dup: false");
    }

    #[test]
    fn bootstrap_continues_after_failures() {
        let mock = Arc::new(MockServer::new());
        mock.fail(Op::Initialize, ResultCode::BUSY);
        mock.fail(Op::OpenSessions, ResultCode::INVALID_STATE);
        let console = LogConsole::new(16);

        let _serving = session(&mock, &console)
            .bootstrap(&DistributionParams::default(), SessionPolicy::default());

        assert_eq!(mock.calls().len(), 2);
        let lines = console.lines();
        assert!(lines[0].starts_with("Initialize failed! res: "));
        assert!(lines[1].starts_with("OpenSessions failed! res: "));
    }

    #[test]
    fn shutdown_closes_then_finalizes_even_on_failure() {
        let mock = Arc::new(MockServer::new());
        mock.fail(Op::CloseSessions, ResultCode::INVALID_STATE);
        mock.fail(Op::Finalize, ResultCode::NOT_INITIALIZED);
        let console = LogConsole::new(16);

        let serving = session(&mock, &console)
            .bootstrap(&DistributionParams::default(), SessionPolicy::default());
        mock.clear_calls();
        let _closed = serving.shutdown();

        assert_eq!(mock.calls(), vec![Call::CloseSessions, Call::Finalize]);
        let lines = console.lines();
        assert!(lines
            .iter()
            .any(|line| line.starts_with("CloseSessions failed!")));
        assert!(lines.iter().any(|line| line.starts_with("Finalize failed!")));
    }
}
