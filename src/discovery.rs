//! Locating the sensor board by asking every candidate port who it is.
//!
//! Each candidate is opened briefly, sent `?I` until it answers or the probe
//! budget runs out, and closed again before moving on. The scan stops at the
//! first port whose answer equals the expected identity.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::config::{CandidatePorts, CMD_IDENTIFY};
use crate::error::TransportError;
use crate::transport::{LineTransport, PortOpener};

/// Outcome of one pass over the candidate ports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Every port that could be opened, in probe order. Diagnostic only.
    pub available: Vec<String>,
    /// The port whose device answered with the expected identity.
    pub matched: Option<String>,
    /// Last identity string received (empty if no port ever answered).
    pub last_identity: String,
}

/// Expand a candidate description into concrete port names, in probe order.
pub fn candidate_names<O: PortOpener>(candidates: &CandidatePorts, opener: &O) -> Vec<String> {
    match candidates {
        CandidatePorts::Enumerated => {
            let mut names = opener.available_ports();
            names.sort();
            names.dedup();
            names
        }
        CandidatePorts::Numbered {
            prefix,
            first,
            count,
        } => (0..*count)
            .map(|i| format!("{prefix}{}", first.saturating_add(i)))
            .collect(),
        CandidatePorts::Explicit(names) => names.clone(),
    }
}

/// Ask an open transport for its identity, repeating `?I` until a non-empty
/// reply arrives or `budget` has elapsed.
///
/// Returns an empty string when the device stayed silent.
pub fn probe_identity<T: LineTransport + ?Sized>(
    transport: &mut T,
    budget: Duration,
) -> Result<String, TransportError> {
    let start = Instant::now();
    loop {
        transport.send_line(CMD_IDENTIFY)?;
        let reply = transport.receive_line()?;
        if !reply.is_empty() {
            return Ok(reply);
        }
        if start.elapsed() >= budget {
            return Ok(String::new());
        }
    }
}

/// Probe `candidates` in order and report the first one answering `expected`.
///
/// Ports that cannot be opened are skipped. A port that errors mid-probe is
/// counted as available but treated as silent. Finding nothing is not an
/// error; check [`ScanReport::matched`].
pub fn scan<O, I, S>(
    opener: &mut O,
    candidates: I,
    baud_rate: u32,
    read_timeout: Duration,
    expected: &str,
    probe_timeout: Duration,
) -> ScanReport
where
    O: PortOpener,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = ScanReport::default();
    for name in candidates {
        let name = name.as_ref();
        let mut transport = match opener.open(name, baud_rate, read_timeout) {
            Ok(t) => t,
            Err(e) => {
                debug!("skipping {name}: {e}");
                continue;
            }
        };
        report.available.push(name.to_string());

        let identity = probe_identity(&mut transport, probe_timeout).unwrap_or_else(|e| {
            debug!("probe of {name} failed: {e}");
            String::new()
        });
        transport.close();
        debug!("{name} identified as {identity:?}");

        let is_match = identity == expected;
        report.last_identity = identity;
        if is_match {
            report.matched = Some(name.to_string());
            break;
        }
    }
    info!(
        "scan finished: available={:?} matched={:?} identity={:?}",
        report.available, report.matched, report.last_identity
    );
    report
}
