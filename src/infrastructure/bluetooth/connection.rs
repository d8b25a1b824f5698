//! Connection manager and command channel.
//!
//! Owns the single RFCOMM stream to the motor controller. Both activity
//! surfaces go through `send`/`close`; the internal mutex serializes them,
//! so a close can never tear a write mid-flight and concurrent closes
//! release the handle exactly once. There is no reconnect path: once the
//! manager is `Closed` it stays closed for the rest of the process.

use crate::domain::models::{ConnectionState, PeerAddress};
use crate::infrastructure::bluetooth::protocol::Command;
use crate::infrastructure::bluetooth::transport::{Connector, TransportStream};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ConnectError {
    /// The manager holds at most one connection per run.
    #[error("connection attempt not allowed from state {state:?}")]
    InvalidState { state: ConnectionState },
    /// The peer refused or was unreachable. Single attempt, no retry.
    #[error("could not connect to {address}: {source}")]
    Transport {
        address: PeerAddress,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SendError {
    /// No open connection; the command is dropped.
    #[error("not connected")]
    NotConnected,
    /// The write failed; the link is presumed dead and the connection is
    /// now closed.
    #[error("lost connection to the peripheral: {0}")]
    LinkLost(#[source] std::io::Error),
}

struct Inner {
    state: ConnectionState,
    stream: Option<Box<dyn TransportStream>>,
}

pub struct ConnectionManager {
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ConnectionState::Idle,
                stream: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Keep working through poisoning; close() in particular must never fail.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One connection attempt against `address` on the peripheral's
    /// well-known channel. A failure leaves the manager `Closed`; there is
    /// no internal retry and no second attempt later.
    pub fn open(
        &self,
        connector: &dyn Connector,
        address: &PeerAddress,
        channel: u8,
    ) -> Result<(), ConnectError> {
        let mut inner = self.lock();
        if inner.state != ConnectionState::Idle {
            return Err(ConnectError::InvalidState { state: inner.state });
        }

        inner.state = ConnectionState::Connecting;
        info!("Connecting to {} on channel {}...", address, channel);

        match connector.connect(address, channel) {
            Ok(stream) => {
                inner.stream = Some(stream);
                inner.state = ConnectionState::Open;
                info!("Connected to the motor controller");
                Ok(())
            }
            Err(source) => {
                inner.state = ConnectionState::Closed;
                error!("Connection to {} failed: {}", address, source);
                Err(ConnectError::Transport {
                    address: address.clone(),
                    source,
                })
            }
        }
    }

    /// Write the command's single wire byte. Requires `Open`; anything else
    /// drops the command and reports `NotConnected`.
    pub fn send(&self, command: Command) -> Result<(), SendError> {
        let mut inner = self.lock();
        if inner.state != ConnectionState::Open {
            warn!("Dropping '{}': not connected", command);
            return Err(SendError::NotConnected);
        }
        let Some(stream) = inner.stream.as_mut() else {
            // Open without a stream cannot happen; treat it as closed.
            inner.state = ConnectionState::Closed;
            return Err(SendError::NotConnected);
        };

        let wire = [command.wire_byte()];
        match stream.write_all(&wire).and_then(|()| stream.flush()) {
            Ok(()) => {
                debug!("Sent '{}' ({:?})", command, wire[0] as char);
                Ok(())
            }
            Err(source) => {
                error!("Write failed, closing the link: {}", source);
                Self::teardown(&mut inner);
                Err(SendError::LinkLost(source))
            }
        }
    }

    /// Idempotent. The first call releases the transport handle; later and
    /// concurrent calls observe `Closed` and do nothing. Teardown errors are
    /// logged, never surfaced.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.state == ConnectionState::Closed {
            return;
        }
        Self::teardown(&mut inner);
    }

    fn teardown(inner: &mut Inner) {
        if let Some(mut stream) = inner.stream.take() {
            match stream.shutdown() {
                Ok(()) => info!("Connection closed"),
                Err(e) => warn!("Transport teardown failed (ignored): {}", e),
            }
        }
        inner.state = ConnectionState::Closed;
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::protocol::RFCOMM_CHANNEL;
    use crate::infrastructure::bluetooth::simulated::{SimulatedLink, SimulatedMedium};
    use std::sync::Arc;

    const PEER: &str = "AA:BB:CC:DD:EE:01";

    fn open_manager() -> (ConnectionManager, SimulatedLink) {
        let medium = SimulatedMedium::single_peer(PEER, "ESP32_Motor_Control");
        let link = medium.link();
        let manager = ConnectionManager::new();
        manager
            .open(&medium, &PeerAddress::new(PEER), RFCOMM_CHANNEL)
            .unwrap();
        (manager, link)
    }

    #[test]
    fn test_send_writes_single_wire_byte() {
        let (manager, link) = open_manager();

        manager.send(Command::Forward).unwrap();

        assert_eq!(link.written(), vec![b'f']);
    }

    #[test]
    fn test_send_sequence_preserves_order() {
        let (manager, link) = open_manager();

        manager.send(Command::Forward).unwrap();
        manager.send(Command::Stop).unwrap();

        assert_eq!(link.written(), vec![b'f', b's']);
    }

    #[test]
    fn test_send_before_open_is_not_connected() {
        let manager = ConnectionManager::new();

        let err = manager.send(Command::Forward).unwrap_err();

        assert!(matches!(err, SendError::NotConnected));
        assert_eq!(manager.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_open_failure_closes_the_manager() {
        let medium = SimulatedMedium::single_peer(PEER, "ESP32_Motor_Control");
        medium.link().set_connect_refused(true);
        let manager = ConnectionManager::new();

        let err = manager
            .open(&medium, &PeerAddress::new(PEER), RFCOMM_CHANNEL)
            .unwrap_err();

        assert!(matches!(err, ConnectError::Transport { .. }));
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_second_open_is_rejected() {
        let (manager, _link) = open_manager();
        let medium = SimulatedMedium::single_peer(PEER, "ESP32_Motor_Control");

        let err = manager
            .open(&medium, &PeerAddress::new(PEER), RFCOMM_CHANNEL)
            .unwrap_err();

        assert!(matches!(
            err,
            ConnectError::InvalidState {
                state: ConnectionState::Open
            }
        ));
    }

    #[test]
    fn test_write_failure_closes_the_link() {
        let (manager, link) = open_manager();
        link.set_write_failure(true);

        let err = manager.send(Command::Backward).unwrap_err();
        assert!(matches!(err, SendError::LinkLost(_)));
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert_eq!(link.shutdown_count(), 1);

        // Every later send degrades to NotConnected.
        let err = manager.send(Command::Stop).unwrap_err();
        assert!(matches!(err, SendError::NotConnected));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (manager, link) = open_manager();

        manager.close();
        manager.close();
        manager.close();

        assert_eq!(link.shutdown_count(), 1);
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_send_after_close_is_not_connected() {
        let (manager, link) = open_manager();
        manager.close();

        let err = manager.send(Command::Forward).unwrap_err();

        assert!(matches!(err, SendError::NotConnected));
        assert!(link.written().is_empty());
    }

    #[test]
    fn test_concurrent_close_releases_handle_once() {
        let (manager, link) = open_manager();
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || manager.close())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(link.shutdown_count(), 1);
        assert_eq!(manager.state(), ConnectionState::Closed);
    }
}
