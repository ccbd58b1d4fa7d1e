//! In-process stand-in for the platform distribution service
//!
//! Models just enough of a distribution run to drive the demo: clients show up while
//! the session accepts, accepted clients receive the payload once distribution starts,
//! and finished clients can be rebooted into the child program. Every server state
//! transition queues one notification for [`DistributionServer::poll_state_change`].
//!
//! ```text
//! Initialized ──open──► Accepting ──start──► Distributing ──► Complete
//!      ▲                    ▲                                    │
//!      │ close              └──────────── Rebooting ◄──reboot────┘
//! ```

use super::{
    ClientProgress, ClientState, DistributionParams, DistributionServer, DlpResult, NodeId,
    PollMode, ResultCode, ServerState, SessionPolicy,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const MAX_CLIENTS_LIMIT: u8 = 16;
const VALID_CHANNELS: [u8; 4] = [0, 1, 6, 11];
const FIRST_NODE_ID: u16 = 2;

/// Time source returning the time elapsed since the simulator started
pub type Clock = Arc<dyn Fn() -> Duration + Send + Sync>;

#[derive(Clone, Debug)]
pub struct SimulatorSettings {
    /// A new client connects this often while the session accepts
    pub join_interval: Duration,
    /// Size of the payload in transmission units
    pub total_units: u32,
    pub units_per_second: u32,
    /// How long clients take to reboot before the session accepts again
    pub reboot_duration: Duration,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            join_interval: Duration::from_secs(3),
            total_units: 400,
            units_per_second: 40,
            reboot_duration: Duration::from_secs(2),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Initialized,
    Open,
}

#[derive(Debug)]
struct SimClient {
    node: NodeId,
    state: ClientState,
    // thousandths of a unit, so slow rates still make progress per tick
    milli_units: u64,
}

#[derive(Debug)]
struct SimState {
    phase: Phase,
    server_state: ServerState,
    max_clients: u8,
    policy: SessionPolicy,
    clients: Vec<SimClient>,
    next_node: u16,
    last_join: Duration,
    last_tick: Duration,
    reboot_started: Duration,
    pending_changes: u32,
}

impl SimState {
    fn set_server_state(&mut self, state: ServerState) {
        if self.server_state != state {
            debug!("Simulated server state {} -> {}", self.server_state, state);
            self.server_state = state;
            self.pending_changes += 1;
        }
    }

    fn require_initialized(&self) -> DlpResult<()> {
        match self.phase {
            Phase::Uninitialized => Err(ResultCode::NOT_INITIALIZED),
            _ => Ok(()),
        }
    }

    fn require_open(&self) -> DlpResult<()> {
        match self.phase {
            Phase::Uninitialized => Err(ResultCode::NOT_INITIALIZED),
            Phase::Initialized => Err(ResultCode::INVALID_STATE),
            Phase::Open => Ok(()),
        }
    }

    fn client_mut(&mut self, node: NodeId) -> DlpResult<&mut SimClient> {
        self.clients
            .iter_mut()
            .find(|client| client.node == node)
            .ok_or(ResultCode::OUT_OF_RANGE)
    }

    fn advance(&mut self, now: Duration, settings: &SimulatorSettings) {
        let elapsed = now.saturating_sub(self.last_tick);
        self.last_tick = now;

        if self.phase != Phase::Open {
            return;
        }

        match self.server_state {
            ServerState::Accepting => self.admit_clients(now, settings),
            ServerState::Distributing => self.transfer(elapsed, settings),
            ServerState::Rebooting => {
                if now.saturating_sub(self.reboot_started) >= settings.reboot_duration {
                    self.clients.clear();
                    self.last_join = now;
                    self.set_server_state(ServerState::Accepting);
                }
            }
            _ => {}
        }
    }

    fn admit_clients(&mut self, now: Duration, settings: &SimulatorSettings) {
        if settings.join_interval.is_zero() {
            return;
        }
        while now.saturating_sub(self.last_join) >= settings.join_interval {
            if self.clients.len() >= usize::from(self.max_clients) {
                self.last_join = now;
                break;
            }
            self.last_join += settings.join_interval;

            let node = NodeId(self.next_node);
            self.next_node = self.next_node.wrapping_add(1);
            let state = if self.policy.manual_accept {
                ClientState::Connecting
            } else {
                ClientState::Accepted
            };
            info!("Simulated client {} connected", node);
            self.clients.push(SimClient {
                node,
                state,
                milli_units: 0,
            });
        }
    }

    fn transfer(&mut self, elapsed: Duration, settings: &SimulatorSettings) {
        let step = u64::from(settings.units_per_second) * elapsed.as_millis() as u64;
        let total = u64::from(settings.total_units) * 1000;

        let mut receiving = 0;
        for client in self
            .clients
            .iter_mut()
            .filter(|client| client.state == ClientState::Receiving)
        {
            client.milli_units = (client.milli_units + step).min(total);
            if client.milli_units >= total {
                debug!("Simulated client {} received the payload", client.node);
                client.state = ClientState::Received;
            } else {
                receiving += 1;
            }
        }

        if receiving == 0 {
            self.set_server_state(ServerState::Complete);
        }
    }
}

/// Distribution service simulated in memory
pub struct SimulatedServer {
    settings: SimulatorSettings,
    clock: Clock,
    state: Mutex<SimState>,
}

impl SimulatedServer {
    pub fn new(settings: SimulatorSettings) -> Self {
        let started = Instant::now();
        Self::with_clock(settings, Arc::new(move || started.elapsed()))
    }

    pub fn with_clock(settings: SimulatorSettings, clock: Clock) -> Self {
        info!("Creating simulated distribution server: {:?}", settings);
        Self {
            settings,
            clock,
            state: Mutex::new(SimState {
                phase: Phase::Uninitialized,
                server_state: ServerState::Invalid,
                max_clients: 0,
                policy: SessionPolicy::default(),
                clients: Vec::new(),
                next_node: FIRST_NODE_ID,
                last_join: Duration::ZERO,
                last_tick: Duration::ZERO,
                reboot_started: Duration::ZERO,
                pending_changes: 0,
            }),
        }
    }

    /// Locks the state after catching it up to the current time
    fn tick(&self) -> MutexGuard<'_, SimState> {
        let now = (self.clock)();
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.advance(now, &self.settings);
        state
    }
}

impl DistributionServer for SimulatedServer {
    fn initialize(&self, params: &DistributionParams) -> DlpResult<bool> {
        let mut state = self.tick();
        if state.phase != Phase::Uninitialized {
            return Err(ResultCode::ALREADY_INITIALIZED);
        }
        if params.max_clients == 0 || params.max_clients > MAX_CLIENTS_LIMIT {
            return Err(ResultCode::OUT_OF_RANGE);
        }

        info!(
            "Simulated server initialized for {:06x}/{} as \"{}\"",
            params.unique_id, params.child_index, params.user_name
        );
        state.phase = Phase::Initialized;
        state.max_clients = params.max_clients;
        state.set_server_state(ServerState::Initialized);
        Ok(false)
    }

    fn open_sessions(&self, policy: SessionPolicy) -> DlpResult<()> {
        let now = (self.clock)();
        let mut state = self.tick();
        match state.phase {
            Phase::Uninitialized => return Err(ResultCode::NOT_INITIALIZED),
            Phase::Open => return Err(ResultCode::INVALID_STATE),
            Phase::Initialized => {}
        }
        if !VALID_CHANNELS.contains(&policy.channel) {
            return Err(ResultCode::OUT_OF_RANGE);
        }

        state.phase = Phase::Open;
        state.policy = policy;
        state.last_join = now;
        state.set_server_state(ServerState::Accepting);
        Ok(())
    }

    fn start_distribution(&self) -> DlpResult<()> {
        let mut state = self.tick();
        state.require_open()?;
        if state.server_state != ServerState::Accepting {
            return Err(ResultCode::INVALID_STATE);
        }

        let mut accepted = 0;
        for client in state
            .clients
            .iter_mut()
            .filter(|client| client.state == ClientState::Accepted)
        {
            client.state = ClientState::Receiving;
            accepted += 1;
        }
        if accepted == 0 {
            return Err(ResultCode::INVALID_STATE);
        }

        state.set_server_state(ServerState::Distributing);
        Ok(())
    }

    fn reboot_all_clients(&self) -> DlpResult<()> {
        let now = (self.clock)();
        let mut state = self.tick();
        state.require_open()?;
        if state.server_state != ServerState::Complete {
            return Err(ResultCode::INVALID_STATE);
        }

        for client in state
            .clients
            .iter_mut()
            .filter(|client| client.state == ClientState::Received)
        {
            client.state = ClientState::Rebooting;
        }
        state.reboot_started = now;
        state.set_server_state(ServerState::Rebooting);
        Ok(())
    }

    fn get_connecting_clients(&self, out: &mut [NodeId]) -> DlpResult<usize> {
        let state = self.tick();
        state.require_open()?;
        for (slot, client) in out.iter_mut().zip(state.clients.iter()) {
            *slot = client.node;
        }
        Ok(state.clients.len())
    }

    fn accept_client(&self, node: NodeId) -> DlpResult<()> {
        let mut state = self.tick();
        state.require_open()?;
        if state.server_state != ServerState::Accepting {
            return Err(ResultCode::INVALID_STATE);
        }

        let client = state.client_mut(node)?;
        if client.state == ClientState::Connecting {
            client.state = ClientState::Accepted;
        }
        Ok(())
    }

    fn disconnect_client(&self, node: NodeId) -> DlpResult<()> {
        let mut state = self.tick();
        state.require_open()?;
        if state.server_state != ServerState::Accepting {
            return Err(ResultCode::INVALID_STATE);
        }

        let before = state.clients.len();
        state.clients.retain(|client| client.node != node);
        if state.clients.len() == before {
            return Err(ResultCode::OUT_OF_RANGE);
        }
        Ok(())
    }

    fn get_client_state(&self, node: NodeId) -> DlpResult<ClientProgress> {
        let mut state = self.tick();
        state.require_open()?;
        let client = state.client_mut(node)?;
        Ok(ClientProgress {
            state: client.state,
            units_total: self.settings.total_units,
            units_received: (client.milli_units / 1000) as u32,
        })
    }

    fn poll_state_change(&self, _mode: PollMode) -> DlpResult<()> {
        // Nothing here can change while the lock is held, so a blocking poll
        // answers the same way as a non-blocking one.
        let mut state = self.tick();
        state.require_initialized()?;
        if state.pending_changes == 0 {
            return Err(ResultCode::NOT_FOUND);
        }
        state.pending_changes -= 1;
        Ok(())
    }

    fn get_internal_state(&self) -> DlpResult<ServerState> {
        let state = self.tick();
        state.require_initialized()?;
        Ok(state.server_state)
    }

    fn close_sessions(&self) -> DlpResult<()> {
        let mut state = self.tick();
        state.require_open()?;
        state.clients.clear();
        state.phase = Phase::Initialized;
        state.set_server_state(ServerState::Initialized);
        Ok(())
    }

    fn finalize(&self) -> DlpResult<()> {
        let mut state = self.tick();
        state.require_initialized()?;
        state.clients.clear();
        state.phase = Phase::Uninitialized;
        state.server_state = ServerState::Invalid;
        state.pending_changes = 0;
        Ok(())
    }
}
