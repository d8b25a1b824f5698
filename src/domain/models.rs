use std::fmt;

/// Hardware address of a peer on the wireless medium, e.g. "AA:BB:CC:DD:EE:01".
///
/// Produced by discovery, consumed by connection establishment. Opaque to
/// everything except the transport backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerAddress(String);

impl PeerAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One (address, advertised name) pair collected during a scan.
#[derive(Debug, Clone)]
pub struct DiscoveredPeer {
    pub address: PeerAddress,
    pub name: String,
}

/// Connection Manager state machine. `Closed` is terminal; there is no
/// reconnect path in this application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Process-wide lifecycle. Transitions exactly once, `Running -> Terminating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Terminating,
}
