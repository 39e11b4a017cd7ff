//! Configuration for the serial link, discovery and the window.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::readings::DEFAULT_CHANNELS;

// ─────────────────────────────────────────────────────────────────────────────
// Wire protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Identity request, answered with the device name.
pub const CMD_IDENTIFY: &str = "?I";
/// Sensor request, answered with one comma separated reading set.
pub const CMD_SENSORS: &str = "?S";
/// Calibration trigger. The device sends no reply.
pub const CMD_CALIBRATE: &str = "?C";

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_IDENTITY: &str = "HARP";

// ─────────────────────────────────────────────────────────────────────────────
// Candidate ports
// ─────────────────────────────────────────────────────────────────────────────

/// The set of port names discovery walks through, in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidatePorts {
    /// Whatever the OS reports via `serialport::available_ports`, sorted by name.
    Enumerated,
    /// `prefix` followed by a number, e.g. `COM1`..`COM256`.
    Numbered { prefix: String, first: u32, count: u32 },
    /// A fixed list, tried in the given order.
    Explicit(Vec<String>),
}

impl Default for CandidatePorts {
    fn default() -> Self {
        if cfg!(windows) {
            CandidatePorts::Numbered {
                prefix: "COM".to_string(),
                first: 1,
                count: 256,
            }
        } else {
            CandidatePorts::Enumerated
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Device link
// ─────────────────────────────────────────────────────────────────────────────

/// Serial and protocol parameters for talking to the sensor board.
///
/// Durations serialize as whole milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub baud_rate: u32,
    /// How long a single line read may block before it counts as "no data".
    #[serde(with = "duration_ms")]
    pub read_timeout: Duration,
    /// Wall-clock budget for repeating the identity probe on one port.
    #[serde(with = "duration_ms")]
    pub probe_timeout: Duration,
    /// Period between sensor requests while connected.
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
    /// Expected answer to `?I`.
    pub device_identity: String,
    /// Number of comma separated values in a `?S` reply.
    pub channel_count: usize,
    pub candidates: CandidatePorts,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_secs(1),
            probe_timeout: Duration::from_secs(3),
            poll_interval: Duration::from_millis(10),
            device_identity: DEFAULT_IDENTITY.to_string(),
            channel_count: DEFAULT_CHANNELS,
            candidates: CandidatePorts::default(),
        }
    }
}

impl DeviceConfig {
    /// Set the poll rate in Hz. Non-positive rates, and rates too slow to fit
    /// in a `Duration`, are ignored.
    pub fn with_poll_rate_hz(mut self, hz: f64) -> Self {
        if hz > 0.0 {
            if let Ok(interval) = Duration::try_from_secs_f64(1.0 / hz) {
                self.poll_interval = interval;
            }
        }
        self
    }

    pub fn with_identity<S: Into<String>>(mut self, identity: S) -> Self {
        self.device_identity = identity.into();
        self
    }

    pub fn with_candidates(mut self, candidates: CandidatePorts) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Fractional milliseconds, so sub-millisecond poll intervals survive.
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        Duration::try_from_secs_f64(ms / 1000.0).map_err(D::Error::custom)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SensorTestConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration for the sensor test window.
///
/// | Field            | Purpose |
/// |------------------|---------|
/// | `device`         | Serial link, discovery and polling parameters |
/// | `title`          | Native window title |
/// | `native_options` | Optional eframe window options |
#[derive(Clone)]
pub struct SensorTestConfig {
    pub device: DeviceConfig,

    // ── Window / chrome ──────────────────────────────────────────────────────
    pub title: String,
    /// Optional eframe native-window options. A default 800×600 viewport is
    /// used when `None`.
    pub native_options: Option<eframe::NativeOptions>,
}

impl Default for SensorTestConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            title: "Sensor Testing Program".to_string(),
            native_options: None,
        }
    }
}
