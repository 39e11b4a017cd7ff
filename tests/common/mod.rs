//! Scripted in-memory devices for exercising discovery, polling and the
//! session without serial hardware.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use sensor_test::{LineTransport, PortOpener, TransportError};

/// How long a silent device makes `receive_line` block.
pub const SILENT_READ: Duration = Duration::from_millis(2);

/// One scripted reply to `?S`.
#[derive(Debug, Clone)]
pub enum Reply {
    Line(String),
    Silent,
    Fail,
}

pub fn line(s: &str) -> Reply {
    Reply::Line(s.to_string())
}

#[derive(Debug, Default)]
pub struct DeviceState {
    /// Answer to `?I`; `None` keeps the device silent.
    pub identity: Option<String>,
    /// Number of `?I` requests answered with nothing before the identity.
    pub identity_delay: usize,
    /// Reading the answer to `?I` fails with an I/O error.
    pub identity_fails: bool,
    /// Writing this command fails with an I/O error.
    pub fail_write_of: Option<String>,
    /// Replies to `?S`, consumed in order.
    pub script: VecDeque<Reply>,
    /// Reply once the script is exhausted.
    pub fallback: Option<String>,
    pub sent: Vec<String>,
    pub opens: usize,
    pub closes: usize,
    last_command: Option<String>,
}

pub type Device = Arc<Mutex<DeviceState>>;

pub fn device(identity: Option<&str>) -> Device {
    Arc::new(Mutex::new(DeviceState {
        identity: identity.map(str::to_string),
        ..Default::default()
    }))
}

pub fn sensor_device(identity: &str, script: Vec<Reply>, fallback: Option<&str>) -> Device {
    Arc::new(Mutex::new(DeviceState {
        identity: Some(identity.to_string()),
        script: script.into(),
        fallback: fallback.map(str::to_string),
        ..Default::default()
    }))
}

pub struct MockTransport {
    pub port: String,
    device: Device,
    open: bool,
}

impl LineTransport for MockTransport {
    fn send_line(&mut self, command: &str) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        let mut dev = self.device.lock().unwrap();
        if dev.fail_write_of.as_deref() == Some(command) {
            return Err(TransportError::WriteFailure(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            )));
        }
        dev.sent.push(command.to_string());
        dev.last_command = Some(command.to_string());
        Ok(())
    }

    fn receive_line(&mut self) -> Result<String, TransportError> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        let reply = {
            let mut dev = self.device.lock().unwrap();
            match dev.last_command.take().as_deref() {
                Some("?I") => {
                    if dev.identity_fails {
                        Reply::Fail
                    } else if dev.identity_delay > 0 {
                        dev.identity_delay -= 1;
                        Reply::Silent
                    } else {
                        dev.identity.clone().map_or(Reply::Silent, Reply::Line)
                    }
                }
                Some("?S") => dev
                    .script
                    .pop_front()
                    .or_else(|| dev.fallback.clone().map(Reply::Line))
                    .unwrap_or(Reply::Silent),
                _ => Reply::Silent,
            }
        };
        match reply {
            Reply::Line(s) => Ok(s),
            Reply::Silent => {
                thread::sleep(SILENT_READ);
                Ok(String::new())
            }
            Reply::Fail => Err(TransportError::ReadFailure(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            ))),
        }
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.device.lock().unwrap().closes += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Opens mock ports by name. Unknown names behave like missing ports.
#[derive(Clone, Default)]
pub struct MockOpener {
    pub devices: HashMap<String, Device>,
    /// Every open attempt, including failed ones, in order.
    pub attempts: Arc<Mutex<Vec<String>>>,
}

impl MockOpener {
    pub fn with(mut self, port: &str, device: Device) -> Self {
        self.devices.insert(port.to_string(), device);
        self
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

impl PortOpener for MockOpener {
    type Transport = MockTransport;

    fn open(
        &mut self,
        port: &str,
        _baud_rate: u32,
        _read_timeout: Duration,
    ) -> Result<MockTransport, TransportError> {
        self.attempts.lock().unwrap().push(port.to_string());
        let device = self
            .devices
            .get(port)
            .cloned()
            .ok_or_else(|| TransportError::PortUnavailable {
                port: port.to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "no such port"),
            })?;
        device.lock().unwrap().opens += 1;
        Ok(MockTransport {
            port: port.to_string(),
            device,
            open: true,
        })
    }

    fn available_ports(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }
}
