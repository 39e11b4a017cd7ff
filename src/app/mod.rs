//! eframe front end: connect/calibrate buttons, a pressure bar chart and
//! millivolt labels, all drawn from a [`crate::SessionSnapshot`].

mod run;
mod sensor_app;

pub use run::run_sensor_test;
pub use sensor_app::{sensor_name, voltage_text, SensorTestApp};
