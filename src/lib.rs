//! sensor-test crate root: re-exports and module wiring.
//!
//! A bench tool for a five-channel pressure sensor board on a serial link.
//! The board answers three line commands: `?I` (identity), `?S` (one
//! comma separated reading set) and `?C` (calibrate, no reply).
//!
//! Modules:
//! - `transport`: line-oriented serial I/O behind the `LineTransport` trait
//! - `discovery`: probing candidate ports for the expected identity
//! - `poller`: fixed-rate acquisition on a worker thread
//! - `session`: connect/disconnect/calibrate and a snapshot for drawing
//! - `readings`: reading sets and the millivolt / pressure mappings
//! - `config`: link, discovery and window configuration
//! - `app`: the eframe window

pub mod app;
pub mod config;
pub mod discovery;
pub mod error;
pub mod poller;
pub mod readings;
pub mod session;
pub mod transport;

// Public re-exports for a compact external API
pub use app::{run_sensor_test, SensorTestApp};
pub use config::{CandidatePorts, DeviceConfig, SensorTestConfig};
pub use discovery::{probe_identity, scan, ScanReport};
pub use error::{ConnectError, SessionError, TransportError};
pub use poller::{poll_cycle, CycleOutcome, PollEvent, Poller, PollerState};
pub use readings::{pressure_percent, voltage_mv, ParseError, SensorReadingSet};
pub use session::{SensorSession, SessionSnapshot};
pub use transport::{LineTransport, PortOpener, SerialOpener, SerialTransport};
