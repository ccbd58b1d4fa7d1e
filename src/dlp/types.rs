//! Data exchanged with the distribution service

use std::fmt;
use thiserror::Error;

/// Number of pending clients fetched per query
pub const MAX_CONNECTING_CLIENTS: usize = 8;

/// Longest display name the service accepts, in UTF-16 code units
pub const USER_NAME_MAX_UNITS: usize = 10;

/// Identifies one connected client within a session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u16);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal server state as reported after a state change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerState {
    Invalid,
    Initialized,
    Accepting,
    Distributing,
    Complete,
    Rebooting,
    Error,
    Other(u32),
}

impl ServerState {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Invalid,
            1 => Self::Initialized,
            2 => Self::Accepting,
            3 => Self::Distributing,
            4 => Self::Complete,
            5 => Self::Rebooting,
            6 => Self::Error,
            other => Self::Other(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Invalid => 0,
            Self::Initialized => 1,
            Self::Accepting => 2,
            Self::Distributing => 3,
            Self::Complete => 4,
            Self::Rebooting => 5,
            Self::Error => 6,
            Self::Other(raw) => raw,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Initialized => "initialized",
            Self::Accepting => "accepting",
            Self::Distributing => "distributing",
            Self::Complete => "complete",
            Self::Rebooting => "rebooting",
            Self::Error => "error",
            Self::Other(_) => "unknown",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.raw(), self.name())
    }
}

/// Per-client state as reported by a client state query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Accepted,
    Receiving,
    Received,
    Rebooting,
    Other(u32),
}

impl ClientState {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Accepted,
            3 => Self::Receiving,
            4 => Self::Received,
            5 => Self::Rebooting,
            other => Self::Other(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Accepted => 2,
            Self::Receiving => 3,
            Self::Received => 4,
            Self::Rebooting => 5,
            Self::Other(raw) => raw,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Accepted => "accepted",
            Self::Receiving => "receiving",
            Self::Received => "received",
            Self::Rebooting => "rebooting",
            Self::Other(_) => "unknown",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.raw(), self.name())
    }
}

/// State and transfer progress of one client
///
/// Units are transmission fragments: `units_total` is the payload size divided by
/// the link MTU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientProgress {
    pub state: ClientState,
    pub units_total: u32,
    pub units_received: u32,
}

/// Whether a state poll may wait for a change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollMode {
    NonBlocking,
    Blocking,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserNameError {
    #[error("user name must not be empty")]
    Empty,

    #[error("user name is {0} UTF-16 units long, at most 10 are allowed")]
    TooLong(usize),
}

/// Display name announced to clients
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserName(String);

impl UserName {
    pub fn new(name: impl Into<String>) -> Result<Self, UserNameError> {
        let name = name.into();
        let units = name.encode_utf16().count();
        if units == 0 {
            return Err(UserNameError::Empty);
        }
        if units > USER_NAME_MAX_UNITS {
            return Err(UserNameError::TooLong(units));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserName {
    fn default() -> Self {
        Self("Wii U".to_string())
    }
}

impl From<UserName> for String {
    fn from(name: UserName) -> Self {
        name.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters announced when the service is initialized
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistributionParams {
    /// Maximum number of clients admitted to a session
    pub max_clients: u8,
    /// Unique id of the distributed title
    pub unique_id: u32,
    /// Which child program of the title is distributed
    pub child_index: u8,
    pub user_name: UserName,
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self {
            max_clients: 2,
            unique_id: 0x000307,
            child_index: 0,
            user_name: UserName::default(),
        }
    }
}

/// Policy a session is opened with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Clients must be accepted explicitly before they take part
    pub manual_accept: bool,
    /// Wireless channel, 0 picks one automatically
    pub channel: u8,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            manual_accept: true,
            channel: 0,
        }
    }
}

/// Clients currently connected to the session, accepted or not
///
/// Holds at most [`MAX_CONNECTING_CLIENTS`] ids. The service may report more than
/// that; the excess is dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectingClients {
    ids: [NodeId; MAX_CONNECTING_CLIENTS],
    len: usize,
}

impl ConnectingClients {
    /// Builds the list from a filled buffer and the count the service reported
    pub fn from_reported(ids: [NodeId; MAX_CONNECTING_CLIENTS], reported: usize) -> Self {
        Self {
            ids,
            len: reported.min(MAX_CONNECTING_CLIENTS),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.ids[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.as_slice().iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connecting_clients_truncate_at_capacity() {
        let mut ids = [NodeId::default(); MAX_CONNECTING_CLIENTS];
        for (slot, id) in ids.iter_mut().zip(1u16..) {
            *slot = NodeId(id);
        }

        let clients = ConnectingClients::from_reported(ids, 12);
        assert_eq!(clients.len(), MAX_CONNECTING_CLIENTS);
        assert_eq!(clients.iter().last(), Some(NodeId(8)));

        let clients = ConnectingClients::from_reported(ids, 3);
        assert_eq!(clients.as_slice(), &[NodeId(1), NodeId(2), NodeId(3)]);

        assert!(ConnectingClients::from_reported(ids, 0).is_empty());
    }

    #[test]
    fn user_name_limits_utf16_length() {
        assert!(UserName::new("Wii U").is_ok());
        assert_eq!(UserName::new(""), Err(UserNameError::Empty));
        assert_eq!(
            UserName::new("ABCDEFGHIJK"),
            Err(UserNameError::TooLong(11))
        );
        // one astral character takes two units
        assert_eq!(
            UserName::new("ABCDEFGHI\u{1F600}"),
            Err(UserNameError::TooLong(11))
        );
    }

    #[test]
    fn states_keep_unknown_raw_values() {
        assert_eq!(ServerState::from_raw(3), ServerState::Distributing);
        assert_eq!(ServerState::from_raw(42).raw(), 42);
        assert_eq!(ServerState::Complete.to_string(), "4 (complete)");
        assert_eq!(ClientState::from_raw(99), ClientState::Other(99));
        assert_eq!(ClientState::Receiving.to_string(), "3 (receiving)");
    }
}
