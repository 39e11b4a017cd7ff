//! Periodic sensor acquisition over a bound connection.
//!
//! The poller moves the transport onto a worker thread, issues `?S` at a
//! fixed rate and reports each cycle through a [`PollEvent`] channel. Any
//! read or write failure ends polling: the transport is closed, one
//! [`PollEvent::Disconnected`] is sent and the worker exits.
//!
//! Scheduling is fixed-rate against absolute deadlines. A cycle that overruns
//! its slot skips the missed ticks; the next cycle starts right away and the
//! schedule continues from there (see [`next_deadline`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{error, trace, warn};

use crate::config::{CMD_CALIBRATE, CMD_SENSORS};
use crate::error::{SessionError, TransportError};
use crate::readings::{ParseError, SensorReadingSet};
use crate::transport::LineTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
}

/// What the consumer hears from a running poller.
#[derive(Debug)]
pub enum PollEvent {
    /// A complete reading set.
    Reading(SensorReadingSet),
    /// The device answered but the line was not a valid reading set. The
    /// connection stays up.
    Malformed { line: String, error: ParseError },
    /// The transport failed; polling has stopped and the port is closed.
    Disconnected(TransportError),
}

/// Result of a single request/response exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Reading(SensorReadingSet),
    /// The read timed out.
    NoData,
    Malformed { line: String, error: ParseError },
}

/// Run one poll cycle: send `?S`, read one line, parse it.
pub fn poll_cycle<T: LineTransport + ?Sized>(
    transport: &mut T,
    channels: usize,
) -> Result<CycleOutcome, TransportError> {
    transport.send_line(CMD_SENSORS)?;
    let line = transport.receive_line()?;
    if line.is_empty() {
        return Ok(CycleOutcome::NoData);
    }
    Ok(match SensorReadingSet::parse(&line, channels) {
        Ok(set) => CycleOutcome::Reading(set),
        Err(error) => CycleOutcome::Malformed { line, error },
    })
}

/// Deadline of the tick after `scheduled`.
///
/// If that tick already lies in the past, the missed ticks are dropped and
/// `now` is returned so the next cycle runs immediately without a burst.
pub fn next_deadline(scheduled: Instant, now: Instant, interval: Duration) -> Instant {
    let next = scheduled + interval;
    if next > now {
        next
    } else {
        now
    }
}

enum PollerCommand {
    Calibrate,
    Stop,
}

/// Handle to a polling worker that owns the transport.
pub struct Poller<T: LineTransport + 'static> {
    commands: Sender<PollerCommand>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<Option<T>>>,
}

impl<T: LineTransport + 'static> Poller<T> {
    /// Start polling `transport` every `interval`. The first cycle runs
    /// immediately.
    pub fn start(
        transport: T,
        interval: Duration,
        channels: usize,
        events: Sender<PollEvent>,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let worker = {
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("sensor-poller".into())
                .spawn(move || run_worker(transport, interval, channels, events, rx, running))?
        };
        Ok(Self {
            commands: tx,
            running,
            worker: Some(worker),
        })
    }

    pub fn state(&self) -> PollerState {
        if self.running.load(Ordering::Acquire) {
            PollerState::Polling
        } else {
            PollerState::Idle
        }
    }

    /// Queue a `?C` for the worker to send between cycles.
    pub fn calibrate(&self) -> Result<(), SessionError> {
        if self.state() == PollerState::Idle {
            return Err(SessionError::PollerStopped);
        }
        self.commands
            .send(PollerCommand::Calibrate)
            .map_err(|_| SessionError::PollerStopped)
    }

    /// Stop polling and get the transport back, still open.
    ///
    /// Waits for a cycle that is already in flight. Returns `None` if the
    /// worker had already released the transport after a failure.
    pub fn stop(mut self) -> Option<T> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<T> {
        self.running.store(false, Ordering::Release);
        let _ = self.commands.send(PollerCommand::Stop);
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(transport) => transport,
            Err(_) => {
                error!("poller worker panicked");
                None
            }
        }
    }
}

impl<T: LineTransport + 'static> Drop for Poller<T> {
    fn drop(&mut self) {
        if let Some(mut transport) = self.shutdown() {
            transport.close();
        }
    }
}

fn run_worker<T: LineTransport>(
    mut transport: T,
    interval: Duration,
    channels: usize,
    events: Sender<PollEvent>,
    commands: Receiver<PollerCommand>,
    running: Arc<AtomicBool>,
) -> Option<T> {
    let mut deadline = Instant::now();
    loop {
        if !running.load(Ordering::Acquire) {
            return Some(transport);
        }

        let event = match poll_cycle(&mut transport, channels) {
            Ok(CycleOutcome::Reading(set)) => Some(PollEvent::Reading(set)),
            Ok(CycleOutcome::NoData) => {
                trace!("poll timed out with no data");
                None
            }
            Ok(CycleOutcome::Malformed { line, error }) => {
                warn!("discarding malformed reading {line:?}: {error}");
                Some(PollEvent::Malformed { line, error })
            }
            Err(e) => return disconnect(transport, e, &events, &running),
        };
        if let Some(event) = event {
            if events.send(event).is_err() {
                // Nobody is listening any more.
                running.store(false, Ordering::Release);
                return Some(transport);
            }
        }

        deadline = next_deadline(deadline, Instant::now(), interval);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match commands.recv_timeout(remaining) {
                Ok(PollerCommand::Calibrate) => {
                    if let Err(e) = transport.send_line(CMD_CALIBRATE) {
                        return disconnect(transport, e, &events, &running);
                    }
                }
                Ok(PollerCommand::Stop) | Err(RecvTimeoutError::Disconnected) => {
                    running.store(false, Ordering::Release);
                    return Some(transport);
                }
                Err(RecvTimeoutError::Timeout) => break,
            }
        }
    }
}

fn disconnect<T: LineTransport>(
    mut transport: T,
    cause: TransportError,
    events: &Sender<PollEvent>,
    running: &AtomicBool,
) -> Option<T> {
    warn!("device disconnected: {cause}");
    running.store(false, Ordering::Release);
    transport.close();
    let _ = events.send(PollEvent::Disconnected(cause));
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_time_cycle_keeps_fixed_rate() {
        let t0 = Instant::now();
        let interval = Duration::from_millis(10);
        let next = next_deadline(t0, t0 + Duration::from_millis(3), interval);
        assert_eq!(next, t0 + interval);
    }

    #[test]
    fn overrun_skips_missed_ticks() {
        let t0 = Instant::now();
        let now = t0 + Duration::from_millis(35);
        let next = next_deadline(t0, now, Duration::from_millis(10));
        assert_eq!(next, now, "an overrun must not queue the three missed ticks");
    }
}
