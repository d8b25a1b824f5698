//! WinRT RFCOMM backend.
//!
//! Classic Bluetooth enumeration plus a StreamSocket against the peer's
//! serial port service. All WinRT async operations are driven to completion
//! with blocking `get()` calls; the core is synchronous by design.

use crate::domain::models::{DiscoveredPeer, PeerAddress};
use crate::infrastructure::bluetooth::transport::{Connector, DiscoveryMedium, TransportStream};
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, info, warn};
use windows::Devices::Bluetooth::BluetoothDevice;
use windows::Devices::Bluetooth::Rfcomm::RfcommServiceId;
use windows::Devices::Enumeration::DeviceInformation;
use windows::Networking::Sockets::StreamSocket;
use windows::Storage::Streams::{DataWriter, IOutputStream};

fn win_err(e: windows::core::Error) -> io::Error {
    io::Error::other(e.message())
}

fn format_address(raw: u64) -> String {
    let b = raw.to_be_bytes();
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        b[2], b[3], b[4], b[5], b[6], b[7]
    )
}

fn parse_address(s: &str) -> io::Result<u64> {
    let mut raw: u64 = 0;
    let mut octets = 0;
    for part in s.split(':') {
        let octet = u8::from_str_radix(part, 16)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "bad bluetooth address"))?;
        raw = (raw << 8) | u64::from(octet);
        octets += 1;
    }
    if octets != 6 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "bad bluetooth address",
        ));
    }
    Ok(raw)
}

/// Windows classic-Bluetooth medium.
pub struct RfcommMedium;

impl DiscoveryMedium for RfcommMedium {
    fn scan(&self, _duration: Duration) -> io::Result<Vec<DiscoveredPeer>> {
        // The system inquiry cache backs FindAllAsync; the AQS selectors
        // cover paired and unpaired classic devices.
        let mut peers = Vec::new();
        for paired in [true, false] {
            let selector =
                BluetoothDevice::GetDeviceSelectorFromPairingState(paired).map_err(win_err)?;
            let infos = DeviceInformation::FindAllAsyncAqsFilter(&selector)
                .map_err(win_err)?
                .get()
                .map_err(win_err)?;
            for i in 0..infos.Size().map_err(win_err)? {
                let info = infos.GetAt(i).map_err(win_err)?;
                let id = info.Id().map_err(win_err)?;
                let device = match BluetoothDevice::FromIdAsync(&id).and_then(|op| op.get()) {
                    Ok(device) => device,
                    Err(e) => {
                        debug!("Skipping device {}: {}", id, e.message());
                        continue;
                    }
                };
                let name = device
                    .Name()
                    .map(|n| n.to_string())
                    .unwrap_or_default();
                let address = device.BluetoothAddress().map_err(win_err)?;
                peers.push(DiscoveredPeer {
                    address: PeerAddress::new(format_address(address)),
                    name,
                });
            }
        }
        Ok(peers)
    }
}

impl Connector for RfcommMedium {
    fn connect(&self, address: &PeerAddress, channel: u8) -> io::Result<Box<dyn TransportStream>> {
        let raw = parse_address(address.as_str())?;
        let device = BluetoothDevice::FromBluetoothAddressAsync(raw)
            .map_err(win_err)?
            .get()
            .map_err(win_err)?;

        // The ESP32 BluetoothSerial stack advertises SPP; the well-known
        // channel maps to the standard serial port service id.
        let serial = RfcommServiceId::SerialPort().map_err(win_err)?;
        let services = device
            .GetRfcommServicesForIdAsync(&serial)
            .map_err(win_err)?
            .get()
            .map_err(win_err)?
            .Services()
            .map_err(win_err)?;
        if services.Size().map_err(win_err)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "peer does not advertise a serial port service",
            ));
        }
        let service = services.GetAt(0).map_err(win_err)?;

        info!("Opening RFCOMM stream on channel {}...", channel);
        let socket = StreamSocket::new().map_err(win_err)?;
        socket
            .ConnectAsync(
                &service.ConnectionHostName().map_err(win_err)?,
                &service.ConnectionServiceName().map_err(win_err)?,
            )
            .map_err(win_err)?
            .get()
            .map_err(win_err)?;
        let output = socket.OutputStream().map_err(win_err)?;

        Ok(Box::new(RfcommStream {
            socket: Some(socket),
            output,
        }))
    }
}

struct RfcommStream {
    socket: Option<StreamSocket>,
    output: IOutputStream,
}

// StreamSocket is an agile WinRT object; cross-thread use is allowed.
unsafe impl Send for RfcommStream {}

impl Write for RfcommStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let writer = DataWriter::CreateDataWriter(&self.output).map_err(win_err)?;
        writer.WriteBytes(buf).map_err(win_err)?;
        writer
            .StoreAsync()
            .map_err(win_err)?
            .get()
            .map_err(win_err)?;
        writer.DetachStream().map_err(win_err)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl TransportStream for RfcommStream {
    fn shutdown(&mut self) -> io::Result<()> {
        if let Some(socket) = self.socket.take() {
            socket.Close().map_err(win_err)?;
        } else {
            warn!("RFCOMM stream already released");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_round_trip() {
        let raw = parse_address("AA:BB:CC:DD:EE:01").unwrap();
        assert_eq!(format_address(raw), "AA:BB:CC:DD:EE:01");
    }

    #[test]
    fn test_bad_address_is_rejected() {
        assert!(parse_address("not-an-address").is_err());
        assert!(parse_address("AA:BB:CC:DD:EE").is_err());
    }
}
