//! Activity coordinator.
//!
//! Reconciles the two activity surfaces: the foreground command loop on the
//! main thread and the presence worker on its own thread. Either may send
//! motion commands or ask the application to exit; the exit request is
//! effective exactly once and always closes the connection before the
//! process terminates. Visibility toggles never touch the connection or the
//! lifecycle.

use crate::domain::models::LifecycleState;
use crate::infrastructure::bluetooth::connection::{ConnectionManager, SendError};
use crate::infrastructure::bluetooth::protocol::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

pub struct Coordinator {
    connection: Arc<ConnectionManager>,
    lifecycle: Mutex<LifecycleState>,
    visible: AtomicBool,
}

impl Coordinator {
    pub fn new(connection: Arc<ConnectionManager>) -> Self {
        Self {
            connection,
            lifecycle: Mutex::new(LifecycleState::Running),
            // The controller surface starts hidden, like the original window
            visible: AtomicBool::new(false),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, LifecycleState> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forward a motion command to the peripheral. Send failures are
    /// absorbed by the caller; nothing here is fatal.
    pub fn send(&self, command: Command) -> Result<(), SendError> {
        if *self.lifecycle() == LifecycleState::Terminating {
            warn!("Dropping '{}': application is terminating", command);
            return Err(SendError::NotConnected);
        }
        self.connection.send(command)
    }

    /// First caller wins: flips the lifecycle to `Terminating` and closes
    /// the connection. Returns whether this call performed the teardown;
    /// the losing surface sees `false` and must not exit twice.
    pub fn request_exit(&self) -> bool {
        {
            let mut lifecycle = self.lifecycle();
            if *lifecycle == LifecycleState::Terminating {
                return false;
            }
            *lifecycle = LifecycleState::Terminating;
        }

        info!("Exit requested; closing the connection");
        self.connection.close();
        true
    }

    pub fn exit_requested(&self) -> bool {
        *self.lifecycle() == LifecycleState::Terminating
    }

    pub fn request_show(&self) {
        self.visible.store(true, Ordering::SeqCst);
        info!("Controller surface shown");
    }

    pub fn request_hide(&self) {
        self.visible.store(false, Ordering::SeqCst);
        info!("Controller surface hidden");
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ConnectionState, PeerAddress};
    use crate::infrastructure::bluetooth::protocol::RFCOMM_CHANNEL;
    use crate::infrastructure::bluetooth::simulated::{SimulatedLink, SimulatedMedium};

    fn open_coordinator() -> (Arc<Coordinator>, SimulatedLink) {
        let medium = SimulatedMedium::single_peer("AA:BB:CC:DD:EE:01", "ESP32_Motor_Control");
        let link = medium.link();
        let connection = Arc::new(ConnectionManager::new());
        connection
            .open(
                &medium,
                &PeerAddress::new("AA:BB:CC:DD:EE:01"),
                RFCOMM_CHANNEL,
            )
            .unwrap();
        (Arc::new(Coordinator::new(connection)), link)
    }

    #[test]
    fn test_exit_is_once_effective() {
        let (coordinator, link) = open_coordinator();

        assert!(coordinator.request_exit());
        assert!(!coordinator.request_exit());

        assert!(coordinator.exit_requested());
        assert_eq!(link.shutdown_count(), 1);
        assert_eq!(coordinator.connection().state(), ConnectionState::Closed);
    }

    #[test]
    fn test_concurrent_exit_from_both_surfaces() {
        let (coordinator, link) = open_coordinator();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                std::thread::spawn(move || coordinator.request_exit())
            })
            .collect();
        let winners: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(winners.iter().filter(|&&won| won).count(), 1);
        assert_eq!(link.shutdown_count(), 1);
        assert!(coordinator.exit_requested());
    }

    #[test]
    fn test_show_hide_do_not_touch_connection() {
        let (coordinator, link) = open_coordinator();

        coordinator.request_show();
        assert!(coordinator.is_visible());
        coordinator.request_hide();
        assert!(!coordinator.is_visible());

        assert!(!coordinator.exit_requested());
        assert_eq!(coordinator.connection().state(), ConnectionState::Open);
        assert_eq!(link.shutdown_count(), 0);
    }

    #[test]
    fn test_send_after_exit_is_dropped() {
        let (coordinator, link) = open_coordinator();
        coordinator.request_exit();

        let err = coordinator.send(Command::Forward).unwrap_err();

        assert!(matches!(err, SendError::NotConnected));
        assert!(link.written().is_empty());
    }

    #[test]
    fn test_send_forwards_to_the_peripheral() {
        let (coordinator, link) = open_coordinator();

        coordinator.send(Command::Backward).unwrap();
        coordinator.send(Command::Stop).unwrap();

        assert_eq!(link.written(), vec![b'b', b's']);
    }
}
