//! Distribution service boundary
//!
//! The local wireless distribution service pushes a downloadable child program to
//! nearby client consoles. Everything behind this boundary (session state, client
//! bookkeeping, the radio protocol) belongs to the service; this crate only issues
//! requests and reads the returned status.
//!
//! ```text
//! Input loop ──┐
//!              ├──► DistributionServer ──► SimulatedServer / platform service
//! Poll loop ───┘
//! ```

pub mod result;
pub mod simulator;
pub mod types;

#[cfg(test)]
pub mod mock;

pub use result::{DlpResult, ResultCode};
pub use simulator::{SimulatedServer, SimulatorSettings};
pub use types::{
    ClientProgress, ClientState, ConnectingClients, DistributionParams, NodeId, PollMode,
    ServerState, SessionPolicy, UserName, MAX_CONNECTING_CLIENTS,
};

/// Request/response API of the distribution service
///
/// One method per service operation. Calls block until the service answers and may
/// be issued from several threads at once.
pub trait DistributionServer: Send + Sync {
    /// Sets up the service for the given title; returns whether a duplicate
    /// notice has to be shown to the user
    fn initialize(&self, params: &DistributionParams) -> DlpResult<bool>;

    fn open_sessions(&self, policy: SessionPolicy) -> DlpResult<()>;

    /// Starts pushing the child program to all accepted clients
    fn start_distribution(&self) -> DlpResult<()>;

    /// Reboots every client that finished receiving into the child program
    fn reboot_all_clients(&self) -> DlpResult<()>;

    /// Writes the connected clients into `out` and returns how many the service
    /// knows about, which may exceed `out.len()`
    fn get_connecting_clients(&self, out: &mut [NodeId]) -> DlpResult<usize>;

    fn accept_client(&self, node: NodeId) -> DlpResult<()>;

    fn disconnect_client(&self, node: NodeId) -> DlpResult<()>;

    fn get_client_state(&self, node: NodeId) -> DlpResult<ClientProgress>;

    /// Checks for a server state change. A non-blocking poll with nothing to
    /// report fails with [`ResultCode::NOT_FOUND`]
    fn poll_state_change(&self, mode: PollMode) -> DlpResult<()>;

    fn get_internal_state(&self) -> DlpResult<ServerState>;

    fn close_sessions(&self) -> DlpResult<()>;

    fn finalize(&self) -> DlpResult<()>;
}

impl ConnectingClients {
    /// Queries the service for the clients connected to the session
    pub fn fetch(server: &dyn DistributionServer) -> DlpResult<Self> {
        let mut ids = [NodeId::default(); MAX_CONNECTING_CLIENTS];
        let reported = server.get_connecting_clients(&mut ids)?;
        Ok(Self::from_reported(ids, reported))
    }
}
