//! Transport seams between the core and the Bluetooth medium.
//!
//! The scanner and the connection manager only ever talk to these traits.
//! Real hardware is behind the Windows RFCOMM backend; `simulated` provides
//! an in-memory medium for the `--simulate` mode and the unit tests.

use crate::domain::models::{DiscoveredPeer, PeerAddress};
use std::io::{self, Write};
use std::time::Duration;

/// Abstract scan primitive: collect (address, name) pairs for a bounded
/// duration. A failed scan is an `Err`, an empty medium is `Ok(vec![])`.
pub trait DiscoveryMedium: Send {
    fn scan(&self, duration: Duration) -> io::Result<Vec<DiscoveredPeer>>;
}

/// Opens the duplex byte stream to a peer on a given RFCOMM channel.
pub trait Connector: Send {
    fn connect(&self, address: &PeerAddress, channel: u8) -> io::Result<Box<dyn TransportStream>>;
}

/// Live byte stream to the peer. This deployment only ever writes single
/// command bytes; nothing is read back.
pub trait TransportStream: Write + Send {
    /// Release the underlying handle. The connection manager calls this at
    /// most once.
    fn shutdown(&mut self) -> io::Result<()>;
}
