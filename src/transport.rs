//! Line-oriented request/response over a serial port.
//!
//! [`LineTransport`] is the seam the rest of the crate talks through;
//! [`SerialTransport`] is the real implementation on top of `serialport`.
//! Tests plug in scripted transports through [`PortOpener`].

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use log::{debug, info, trace};
use serialport::SerialPort;

use crate::error::TransportError;

/// One duplex line connection to a device.
pub trait LineTransport: Send {
    /// Write `command` followed by `\n`.
    fn send_line(&mut self, command: &str) -> Result<(), TransportError>;

    /// Wait up to the read timeout for one `\n` terminated line.
    ///
    /// Returns the line without its terminator and surrounding whitespace, or
    /// an empty string if nothing complete arrived in time.
    fn receive_line(&mut self) -> Result<String, TransportError>;

    /// Release the port. Calling this more than once is a no-op.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Something that can claim a port by name and hand back a transport.
pub trait PortOpener {
    type Transport: LineTransport + 'static;

    fn open(
        &mut self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Self::Transport, TransportError>;

    /// Names the OS currently reports, used for [`crate::CandidatePorts::Enumerated`].
    fn available_ports(&self) -> Vec<String> {
        Vec::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// serialport backend
// ─────────────────────────────────────────────────────────────────────────────

/// A serial port opened at a fixed baud rate with a per-line read timeout.
pub struct SerialTransport {
    name: String,
    port: Option<Box<dyn SerialPort>>,
    read_timeout: Duration,
    /// Bytes received after the last complete line.
    pending: Vec<u8>,
}

impl SerialTransport {
    pub fn open(port: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, TransportError> {
        let handle = serialport::new(port, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|source| TransportError::PortUnavailable {
                port: port.to_string(),
                source,
            })?;
        debug!("opened {port} at {baud_rate} baud");
        Ok(Self {
            name: port.to_string(),
            port: Some(handle),
            read_timeout,
            pending: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn take_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}

impl LineTransport for SerialTransport {
    fn send_line(&mut self, command: &str) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        let mut bytes = Vec::with_capacity(command.len() + 1);
        bytes.extend_from_slice(command.as_bytes());
        bytes.push(b'\n');
        port.write_all(&bytes).map_err(TransportError::WriteFailure)?;
        port.flush().map_err(TransportError::WriteFailure)?;
        trace!("{} <- {command}", self.name);
        Ok(())
    }

    fn receive_line(&mut self) -> Result<String, TransportError> {
        if self.port.is_none() {
            return Err(TransportError::Closed);
        }
        let deadline = Instant::now() + self.read_timeout;
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.take_line() {
                trace!("{} -> {line}", self.name);
                return Ok(line);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(String::new());
            }
            let port = self.port.as_mut().ok_or(TransportError::Closed)?;
            port.set_timeout(remaining)
                .map_err(|e| TransportError::ReadFailure(e.into()))?;
            match port.read(&mut chunk) {
                Ok(0) => return Ok(String::new()),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(String::new()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::ReadFailure(e)),
            }
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            self.pending.clear();
            info!("closed {}", self.name);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens real serial ports.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialOpener;

impl PortOpener for SerialOpener {
    type Transport = SerialTransport;

    fn open(
        &mut self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<SerialTransport, TransportError> {
        SerialTransport::open(port, baud_rate, read_timeout)
    }

    fn available_ports(&self) -> Vec<String> {
        match serialport::available_ports() {
            Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
            Err(e) => {
                log::warn!("could not enumerate serial ports: {e}");
                Vec::new()
            }
        }
    }
}
