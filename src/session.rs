//! The operator-facing session: connect, disconnect, calibrate, and a
//! read-only snapshot of the latest readings for the presentation layer.
//!
//! A session owns at most one connection at a time. Connecting runs a
//! discovery scan on the calling thread, reopens the matched port and hands
//! it to a [`Poller`]. Call [`SensorSession::process_events`] regularly (once
//! per UI frame) to fold poller output into the snapshot.

use std::sync::mpsc::{self, Receiver, TryRecvError};

use chrono::{DateTime, Local};
use log::{info, warn};

use crate::config::DeviceConfig;
use crate::discovery::{candidate_names, scan, ScanReport};
use crate::error::{ConnectError, SessionError};
use crate::poller::{PollEvent, Poller, PollerState};
use crate::transport::{LineTransport, PortOpener};

/// What the presentation layer needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub port: Option<String>,
    /// Millivolts per channel from the latest valid reading.
    pub voltages_mv: Vec<i64>,
    /// Pressure percent per channel from the latest valid reading.
    pub pressures: Vec<f64>,
    pub last_update: Option<DateTime<Local>>,
    /// Number of replies rejected as malformed since connecting.
    pub malformed_count: u64,
    /// One line describing the last connect/disconnect outcome.
    pub status_message: String,
    pub last_scan: Option<ScanReport>,
}

impl SessionSnapshot {
    fn new(channels: usize) -> Self {
        Self {
            connected: false,
            port: None,
            voltages_mv: vec![0; channels],
            pressures: vec![0.0; channels],
            last_update: None,
            malformed_count: 0,
            status_message: String::new(),
            last_scan: None,
        }
    }
}

pub struct SensorSession<O: PortOpener> {
    config: DeviceConfig,
    opener: O,
    poller: Option<Poller<O::Transport>>,
    events: Option<Receiver<PollEvent>>,
    snapshot: SessionSnapshot,
}

impl<O: PortOpener> SensorSession<O> {
    pub fn new(config: DeviceConfig, opener: O) -> Self {
        let snapshot = SessionSnapshot::new(config.channel_count);
        Self {
            config,
            opener,
            poller: None,
            events: None,
            snapshot,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot.connected
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller
            .as_ref()
            .map_or(PollerState::Idle, Poller::state)
    }

    /// Scan for the device, bind to it and start polling.
    ///
    /// Returns the bound port name. On failure the session stays
    /// disconnected and the snapshot's status message says why.
    pub fn connect(&mut self) -> Result<String, ConnectError> {
        if let Some(port) = self.snapshot.port.clone().filter(|_| self.snapshot.connected) {
            return Err(ConnectError::AlreadyConnected(port));
        }
        // A poller that died on its own may still be parked here.
        self.disconnect();

        let cfg = &self.config;
        let candidates = candidate_names(&cfg.candidates, &self.opener);
        let report = scan(
            &mut self.opener,
            &candidates,
            cfg.baud_rate,
            cfg.read_timeout,
            &cfg.device_identity,
            cfg.probe_timeout,
        );
        let matched = report.matched.clone();
        let seen = report.last_identity.clone();
        self.snapshot.last_scan = Some(report);

        let Some(port) = matched else {
            self.snapshot.status_message = "Failed to recognise device identity.".to_string();
            return Err(ConnectError::NoDeviceFound {
                expected: cfg.device_identity.clone(),
                seen,
            });
        };

        let transport = match self.opener.open(&port, cfg.baud_rate, cfg.read_timeout) {
            Ok(t) => t,
            Err(source) => {
                self.snapshot.status_message = format!("Failed to connect to {port}.");
                return Err(ConnectError::PortUnavailable { port, source });
            }
        };

        let (tx, rx) = mpsc::channel();
        let poller = Poller::start(transport, cfg.poll_interval, cfg.channel_count, tx)?;
        self.poller = Some(poller);
        self.events = Some(rx);
        self.snapshot.connected = true;
        self.snapshot.port = Some(port.clone());
        self.snapshot.malformed_count = 0;
        self.snapshot.status_message = "Connection to device successful.".to_string();
        info!("connected to {port}");
        Ok(port)
    }

    /// Stop polling and close the port. Safe to call when not connected.
    pub fn disconnect(&mut self) {
        if let Some(poller) = self.poller.take() {
            if let Some(mut transport) = poller.stop() {
                transport.close();
            }
        }
        self.events = None;
        if self.snapshot.connected {
            info!("disconnected from {}", self.snapshot.port.as_deref().unwrap_or("?"));
            self.snapshot.status_message = "Disconnected.".to_string();
        }
        self.snapshot.connected = false;
        self.snapshot.port = None;
    }

    /// Connect when `on` is set, disconnect otherwise. Mirrors a checkable
    /// connect button.
    pub fn set_connected(&mut self, on: bool) -> Result<(), ConnectError> {
        if on {
            self.connect().map(|_| ())
        } else {
            self.disconnect();
            Ok(())
        }
    }

    /// Send the calibration command. No reply is awaited.
    pub fn calibrate(&self) -> Result<(), SessionError> {
        if !self.snapshot.connected {
            return Err(SessionError::NotConnected);
        }
        self.poller
            .as_ref()
            .ok_or(SessionError::NotConnected)?
            .calibrate()
    }

    /// Fold pending poller events into the snapshot. Returns how many were
    /// handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        let mut lost = None;
        if let Some(rx) = &self.events {
            loop {
                match rx.try_recv() {
                    Ok(PollEvent::Reading(set)) => {
                        self.snapshot.voltages_mv = set.voltages_mv();
                        self.snapshot.pressures = set.pressures();
                        self.snapshot.last_update = Some(Local::now());
                    }
                    Ok(PollEvent::Malformed { .. }) => {
                        self.snapshot.malformed_count += 1;
                    }
                    Ok(PollEvent::Disconnected(cause)) => {
                        lost = Some(cause);
                        handled += 1;
                        break;
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
                handled += 1;
            }
        }
        if let Some(cause) = lost {
            warn!("connection lost: {cause}");
            // The worker has already closed the port.
            self.poller = None;
            self.events = None;
            self.snapshot.connected = false;
            self.snapshot.port = None;
            self.snapshot.status_message = format!("Connection lost: {cause}");
        }
        handled
    }
}

impl<O: PortOpener> Drop for SensorSession<O> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
