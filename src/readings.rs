//! Sensor reading sets and the raw → millivolt / pressure mappings.
//!
//! The device reports ten-bit ADC counts. Both mappings are pure functions of
//! a single raw value; no smoothing or history is applied.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest raw ADC count the device reports.
pub const RAW_FULL_SCALE: f64 = 1023.0;
/// Supply voltage in millivolts corresponding to `RAW_FULL_SCALE`.
pub const SUPPLY_MV: f64 = 3300.0;
/// Span of the pressure scale in percent (−100..100).
pub const PRESSURE_SPAN: f64 = 200.0;
pub const PRESSURE_OFFSET: f64 = -100.0;

/// Displayed pressure range, matching the chart's fixed Y axis.
pub const PRESSURE_RANGE: (f64, f64) = (-100.0, 100.0);

/// Number of channels on the reference board.
pub const DEFAULT_CHANNELS: usize = 5;

/// Raw count to millivolts, rounded to the nearest integer.
pub fn voltage_mv(raw: f64) -> i64 {
    (raw * SUPPLY_MV / RAW_FULL_SCALE).round() as i64
}

/// Raw count to pressure percent. Nominal output is −100 at 0 and 100 at full scale.
pub fn pressure_percent(raw: f64) -> f64 {
    raw * PRESSURE_SPAN / RAW_FULL_SCALE + PRESSURE_OFFSET
}

/// Why a `?S` response could not be turned into a reading set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected} values, got {got}")]
    WrongCount { expected: usize, got: usize },

    #[error("value {index} is not a number: {token:?}")]
    NotANumber { index: usize, token: String },
}

/// One complete set of raw channel values from a single poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReadingSet {
    raw: Vec<f64>,
}

impl SensorReadingSet {
    /// Parse a comma separated response line.
    ///
    /// The whole line is rejected when the token count differs from
    /// `channels` or any token is not a finite number, so the derived voltage
    /// and pressure vectors always have one entry per channel.
    pub fn parse(line: &str, channels: usize) -> Result<Self, ParseError> {
        let tokens: Vec<&str> = line.split(',').map(str::trim).collect();
        if tokens.len() != channels {
            return Err(ParseError::WrongCount {
                expected: channels,
                got: tokens.len(),
            });
        }
        let raw = tokens
            .iter()
            .enumerate()
            .map(|(index, tok)| match tok.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(ParseError::NotANumber {
                    index,
                    token: (*tok).to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { raw })
    }

    pub fn from_raw(raw: Vec<f64>) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &[f64] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Millivolt value per channel.
    pub fn voltages_mv(&self) -> Vec<i64> {
        self.raw.iter().copied().map(voltage_mv).collect()
    }

    /// Pressure percent per channel.
    pub fn pressures(&self) -> Vec<f64> {
        self.raw.iter().copied().map(pressure_percent).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_hits_range_ends() {
        assert!((pressure_percent(0.0) - PRESSURE_RANGE.0).abs() < 1e-9);
        assert!((pressure_percent(RAW_FULL_SCALE) - PRESSURE_RANGE.1).abs() < 1e-9);
    }

    #[test]
    fn voltage_rounds_to_nearest() {
        // 1 count = 3.2258 mV, 2 counts = 6.45 mV
        assert_eq!(voltage_mv(1.0), 3);
        assert_eq!(voltage_mv(2.0), 6);
        assert_eq!(voltage_mv(1023.0), 3300);
    }

    #[test]
    fn tokens_are_trimmed() {
        let set = SensorReadingSet::parse(" 1, 2 ,3,4,5\r", 5).unwrap();
        assert_eq!(set.raw(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn non_finite_tokens_rejected() {
        let err = SensorReadingSet::parse("1,NaN,3,4,5", 5).unwrap_err();
        assert_eq!(
            err,
            ParseError::NotANumber {
                index: 1,
                token: "NaN".into()
            }
        );
    }
}
