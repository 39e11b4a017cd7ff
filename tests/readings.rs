mod common;

use common::{line, sensor_device, MockOpener};
use sensor_test::readings::{PRESSURE_RANGE, RAW_FULL_SCALE};
use sensor_test::{
    poll_cycle, pressure_percent, voltage_mv, CycleOutcome, ParseError, PortOpener,
    SensorReadingSet,
};
use std::time::Duration;

const TOL: f64 = 1e-6;

#[test]
fn known_response_maps_to_expected_vectors() {
    let set = SensorReadingSet::parse("0,1023,512,100,900", 5).unwrap();

    assert_eq!(set.voltages_mv(), vec![0, 3300, 1652, 323, 2903]);

    let expected = [-100.0, 100.0, 0.097_751_710_654_932_82, -80.449_657_869_012_71, 75.953_079_178_885_62];
    let got = set.pressures();
    assert_eq!(got.len(), expected.len());
    for (g, e) in got.iter().zip(expected) {
        assert!((g - e).abs() < TOL, "pressure {g} != {e}");
    }
}

#[test]
fn pressure_stays_in_display_range_over_raw_domain() {
    for r in 0..=1023 {
        let p = pressure_percent(r as f64);
        assert!(
            p >= PRESSURE_RANGE.0 - TOL && p <= PRESSURE_RANGE.1 + TOL,
            "raw {r} gave {p}"
        );
        let expected_mv = (r as f64 * 3300.0 / RAW_FULL_SCALE).round() as i64;
        assert_eq!(voltage_mv(r as f64), expected_mv);
    }
}

#[test]
fn malformed_token_rejects_whole_reading() {
    let err = SensorReadingSet::parse("0,abc,512,100,900", 5).unwrap_err();
    assert_eq!(
        err,
        ParseError::NotANumber {
            index: 1,
            token: "abc".to_string()
        }
    );
}

#[test]
fn wrong_token_count_is_rejected() {
    assert_eq!(
        SensorReadingSet::parse("1,2,3", 5).unwrap_err(),
        ParseError::WrongCount {
            expected: 5,
            got: 3
        }
    );
    assert!(SensorReadingSet::parse("1,2,3,4,5,6", 5).is_err());
}

#[test]
fn poll_cycle_reports_malformed_line_without_partial_values() {
    let dev = sensor_device("HARP", vec![line("0,abc,512,100,900")], None);
    let mut opener = MockOpener::default().with("p", dev.clone());
    let mut t = opener.open("p", 115_200, Duration::from_millis(10)).unwrap();

    let outcome = poll_cycle(&mut t, 5).unwrap();

    match outcome {
        CycleOutcome::Malformed { line, error } => {
            assert_eq!(line, "0,abc,512,100,900");
            assert!(matches!(error, ParseError::NotANumber { index: 1, .. }));
        }
        other => panic!("expected malformed outcome, got {other:?}"),
    }
    assert_eq!(dev.lock().unwrap().sent, vec!["?S"]);
}

#[test]
fn poll_cycle_timeout_is_no_data() {
    let dev = sensor_device("HARP", Vec::new(), None);
    let mut opener = MockOpener::default().with("p", dev);
    let mut t = opener.open("p", 115_200, Duration::from_millis(10)).unwrap();

    assert_eq!(poll_cycle(&mut t, 5).unwrap(), CycleOutcome::NoData);
}
