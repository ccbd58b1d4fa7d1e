//! Recording test double for [`DistributionServer`]

use super::{
    ClientProgress, ClientState, DistributionParams, DistributionServer, DlpResult, NodeId,
    PollMode, ResultCode, ServerState, SessionPolicy,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// One recorded service call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Initialize,
    OpenSessions(SessionPolicy),
    StartDistribution,
    RebootAllClients,
    GetConnectingClients,
    AcceptClient(NodeId),
    DisconnectClient(NodeId),
    GetClientState(NodeId),
    PollStateChange(PollMode),
    GetInternalState,
    CloseSessions,
    Finalize,
}

/// Operations whose only outcome is a status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Initialize,
    OpenSessions,
    StartDistribution,
    RebootAllClients,
    GetConnectingClients,
    DisconnectClient,
    GetClientState,
    GetInternalState,
    CloseSessions,
    Finalize,
}

struct Script {
    failures: HashMap<Op, ResultCode>,
    accept_failures: HashMap<NodeId, ResultCode>,
    connecting: Vec<NodeId>,
    reported: Option<usize>,
    progress: ClientProgress,
    internal_state: ServerState,
    polls: VecDeque<ResultCode>,
}

/// Scripted service that records every call in order
///
/// Unscripted operations succeed; an empty poll script answers
/// [`ResultCode::NOT_FOUND`].
pub struct MockServer {
    calls: Mutex<Vec<Call>>,
    script: Mutex<Script>,
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(Script {
                failures: HashMap::new(),
                accept_failures: HashMap::new(),
                connecting: Vec::new(),
                reported: None,
                progress: ClientProgress {
                    state: ClientState::Receiving,
                    units_total: 120,
                    units_received: 30,
                },
                internal_state: ServerState::Distributing,
                polls: VecDeque::new(),
            }),
        }
    }

    pub fn fail(&self, op: Op, code: ResultCode) {
        self.script().failures.insert(op, code);
    }

    pub fn fail_accept(&self, node: NodeId, code: ResultCode) {
        self.script().accept_failures.insert(node, code);
    }

    pub fn set_connecting(&self, ids: &[NodeId]) {
        self.script().connecting = ids.to_vec();
    }

    /// Overrides the count reported alongside the connecting clients
    pub fn set_reported(&self, reported: usize) {
        self.script().reported = Some(reported);
    }

    pub fn set_internal_state(&self, state: ServerState) {
        self.script().internal_state = state;
    }

    pub fn push_poll(&self, code: ResultCode) {
        self.script().polls.push_back(code);
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        lock(&self.calls).iter().filter(|call| matches(*call)).count()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        lock(&self.script)
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn outcome(&self, op: Op) -> DlpResult<()> {
        match self.script().failures.get(&op) {
            Some(code) => Err(*code),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DistributionServer for MockServer {
    fn initialize(&self, _params: &DistributionParams) -> DlpResult<bool> {
        self.record(Call::Initialize);
        self.outcome(Op::Initialize).map(|()| false)
    }

    fn open_sessions(&self, policy: SessionPolicy) -> DlpResult<()> {
        self.record(Call::OpenSessions(policy));
        self.outcome(Op::OpenSessions)
    }

    fn start_distribution(&self) -> DlpResult<()> {
        self.record(Call::StartDistribution);
        self.outcome(Op::StartDistribution)
    }

    fn reboot_all_clients(&self) -> DlpResult<()> {
        self.record(Call::RebootAllClients);
        self.outcome(Op::RebootAllClients)
    }

    fn get_connecting_clients(&self, out: &mut [NodeId]) -> DlpResult<usize> {
        self.record(Call::GetConnectingClients);
        self.outcome(Op::GetConnectingClients)?;
        let script = self.script();
        for (slot, id) in out.iter_mut().zip(script.connecting.iter()) {
            *slot = *id;
        }
        Ok(script.reported.unwrap_or(script.connecting.len()))
    }

    fn accept_client(&self, node: NodeId) -> DlpResult<()> {
        self.record(Call::AcceptClient(node));
        match self.script().accept_failures.get(&node) {
            Some(code) => Err(*code),
            None => Ok(()),
        }
    }

    fn disconnect_client(&self, node: NodeId) -> DlpResult<()> {
        self.record(Call::DisconnectClient(node));
        self.outcome(Op::DisconnectClient)
    }

    fn get_client_state(&self, node: NodeId) -> DlpResult<ClientProgress> {
        self.record(Call::GetClientState(node));
        self.outcome(Op::GetClientState)?;
        Ok(self.script().progress)
    }

    fn poll_state_change(&self, mode: PollMode) -> DlpResult<()> {
        self.record(Call::PollStateChange(mode));
        let code = self
            .script()
            .polls
            .pop_front()
            .unwrap_or(ResultCode::NOT_FOUND);
        code.into_result(())
    }

    fn get_internal_state(&self) -> DlpResult<ServerState> {
        self.record(Call::GetInternalState);
        self.outcome(Op::GetInternalState)?;
        Ok(self.script().internal_state)
    }

    fn close_sessions(&self) -> DlpResult<()> {
        self.record(Call::CloseSessions);
        self.outcome(Op::CloseSessions)
    }

    fn finalize(&self) -> DlpResult<()> {
        self.record(Call::Finalize);
        self.outcome(Op::Finalize)
    }
}
