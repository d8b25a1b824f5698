//! Bluetooth Module
//!
//! Discovery and the single RFCOMM command link to the motor controller.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌───────────────────┐
//! │ DeviceScanner │      │ ConnectionManager │
//! │  (discovery)  │      │  (open/send/close)│
//! └───────┬──────┘      └─────────┬─────────┘
//!         │                       │
//!         ▼                       ▼
//! ┌─────────────────────────────────────────┐
//! │   transport traits (medium / stream)     │
//! ├──────────────────────┬──────────────────┤
//! │  rfcomm (Windows)    │    simulated      │
//! └──────────────────────┴──────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Wire encoding and deployment constants
//! - [`transport`] - Medium and stream traits the core is written against
//! - [`scanner`] - Device discovery
//! - [`connection`] - Connection manager and command channel
//! - [`simulated`] - In-memory medium for `--simulate` and tests
//! - `rfcomm` - WinRT RFCOMM backend (Windows only)

pub mod connection;
pub mod protocol;
#[cfg(windows)]
pub mod rfcomm;
pub mod scanner;
pub mod simulated;
pub mod transport;
