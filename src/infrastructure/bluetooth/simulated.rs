//! In-memory medium for the `--simulate` mode and the unit tests.
//!
//! Scans return a fixed peer list and connections write into a shared byte
//! sink, so the whole discover/connect/send/close path runs without radio
//! hardware. The [`SimulatedLink`] handle observes what the "peer" saw and
//! injects scan, connect, and write failures.

use crate::domain::models::{DiscoveredPeer, PeerAddress};
use crate::infrastructure::bluetooth::transport::{Connector, DiscoveryMedium, TransportStream};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Shared handle to the simulated peer side.
#[derive(Clone, Default)]
pub struct SimulatedLink {
    written: Arc<Mutex<Vec<u8>>>,
    shutdowns: Arc<AtomicUsize>,
    fail_scan: Arc<AtomicBool>,
    refuse_connect: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl SimulatedLink {
    /// Every byte the peer has received so far.
    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    /// How many times the transport handle has been released.
    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn set_scan_failure(&self, fail: bool) {
        self.fail_scan.store(fail, Ordering::SeqCst);
    }

    pub fn set_connect_refused(&self, refuse: bool) {
        self.refuse_connect.store(refuse, Ordering::SeqCst);
    }

    pub fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

/// Simulated wireless medium with a fixed set of peers "in range".
#[derive(Clone)]
pub struct SimulatedMedium {
    peers: Vec<DiscoveredPeer>,
    link: SimulatedLink,
}

impl SimulatedMedium {
    pub fn new(peers: Vec<(&str, &str)>) -> Self {
        let peers = peers
            .into_iter()
            .map(|(address, name)| DiscoveredPeer {
                address: PeerAddress::new(address),
                name: name.to_string(),
            })
            .collect();
        Self {
            peers,
            link: SimulatedLink::default(),
        }
    }

    /// One peer advertising `name`, for the `--simulate` demo mode.
    pub fn single_peer(address: &str, name: &str) -> Self {
        Self::new(vec![(address, name)])
    }

    pub fn link(&self) -> SimulatedLink {
        self.link.clone()
    }
}

impl DiscoveryMedium for SimulatedMedium {
    fn scan(&self, _duration: Duration) -> io::Result<Vec<DiscoveredPeer>> {
        if self.link.fail_scan.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated medium unavailable",
            ));
        }
        Ok(self.peers.clone())
    }
}

impl Connector for SimulatedMedium {
    fn connect(&self, address: &PeerAddress, channel: u8) -> io::Result<Box<dyn TransportStream>> {
        if self.link.refuse_connect.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "simulated peer refused the connection",
            ));
        }
        if !self.peers.iter().any(|p| p.address == *address) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no simulated peer at {address}"),
            ));
        }
        debug!("Simulated connect to {} on channel {}", address, channel);
        Ok(Box::new(SimulatedStream {
            link: self.link.clone(),
        }))
    }
}

struct SimulatedStream {
    link: SimulatedLink,
}

impl Write for SimulatedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.link.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "simulated link dropped",
            ));
        }
        self.link.written.lock().unwrap().extend_from_slice(buf);
        debug!("Simulated peer received {:02X?}", buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl TransportStream for SimulatedStream {
    fn shutdown(&mut self) -> io::Result<()> {
        self.link.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
