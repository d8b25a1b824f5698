//! Device discovery.
//!
//! Runs one bounded scan over the medium and picks the peer advertising the
//! configured name. No retry here; the caller decides whether a miss aborts
//! the application.

use crate::domain::models::PeerAddress;
use crate::infrastructure::bluetooth::transport::DiscoveryMedium;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The scan completed but no peer advertised the target name.
    #[error("no device named '{target}' found")]
    NoMatch { target: String },
    /// The scan itself failed (medium unavailable, permission denied).
    #[error("bluetooth scan failed: {0}")]
    Medium(#[from] std::io::Error),
}

pub struct DeviceScanner {
    medium: Box<dyn DiscoveryMedium>,
}

impl DeviceScanner {
    pub fn new(medium: Box<dyn DiscoveryMedium>) -> Self {
        Self { medium }
    }

    /// Scan for `duration` and return the address of the first peer whose
    /// advertised name equals `target` exactly. Case-sensitive, no fuzzy
    /// matching.
    pub fn discover(&self, target: &str, duration: Duration) -> Result<PeerAddress, DiscoveryError> {
        info!(
            "Scanning for '{}' (up to {}s)...",
            target,
            duration.as_secs()
        );

        let peers = self.medium.scan(duration)?;
        debug!("Scan returned {} device(s)", peers.len());

        for peer in peers {
            if peer.name == target {
                info!("Found '{}' at {}", peer.name, peer.address.as_str());
                return Ok(peer.address);
            }
            debug!("Ignoring '{}' at {}", peer.name, peer.address);
        }

        warn!("No device named '{}' in range", target);
        Err(DiscoveryError::NoMatch {
            target: target.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::bluetooth::simulated::SimulatedMedium;
    use std::time::Duration;

    const SCAN: Duration = Duration::from_secs(8);

    #[test]
    fn test_discovery_returns_matching_address() {
        let medium = SimulatedMedium::new(vec![
            ("AA:BB:CC:DD:EE:01", "ESP32_Motor_Control"),
            ("11:22:33:44:55:66", "Other"),
        ]);
        let scanner = DeviceScanner::new(Box::new(medium));

        let address = scanner.discover("ESP32_Motor_Control", SCAN).unwrap();
        assert_eq!(address.as_str(), "AA:BB:CC:DD:EE:01");
    }

    #[test]
    fn test_discovery_first_match_wins() {
        let medium = SimulatedMedium::new(vec![
            ("11:22:33:44:55:66", "ESP32_Motor_Control"),
            ("AA:BB:CC:DD:EE:01", "ESP32_Motor_Control"),
        ]);
        let scanner = DeviceScanner::new(Box::new(medium));

        let address = scanner.discover("ESP32_Motor_Control", SCAN).unwrap();
        assert_eq!(address.as_str(), "11:22:33:44:55:66");
    }

    #[test]
    fn test_discovery_empty_scan_is_no_match() {
        let scanner = DeviceScanner::new(Box::new(SimulatedMedium::new(vec![])));

        let err = scanner.discover("ESP32_Motor_Control", SCAN).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoMatch { .. }));
    }

    #[test]
    fn test_discovery_match_is_case_sensitive() {
        let medium = SimulatedMedium::new(vec![("AA:BB:CC:DD:EE:01", "esp32_motor_control")]);
        let scanner = DeviceScanner::new(Box::new(medium));

        let err = scanner.discover("ESP32_Motor_Control", SCAN).unwrap_err();
        assert!(matches!(err, DiscoveryError::NoMatch { .. }));
    }

    #[test]
    fn test_discovery_medium_failure_is_reported() {
        let medium = SimulatedMedium::new(vec![("AA:BB:CC:DD:EE:01", "ESP32_Motor_Control")]);
        medium.link().set_scan_failure(true);
        let scanner = DeviceScanner::new(Box::new(medium));

        let err = scanner.discover("ESP32_Motor_Control", SCAN).unwrap_err();
        assert!(matches!(err, DiscoveryError::Medium(_)));
    }
}
