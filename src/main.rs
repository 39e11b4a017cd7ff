use sensor_test::{run_sensor_test, SensorTestConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = SensorTestConfig::default();
    log::info!(
        "looking for {:?} at {} baud, polling every {:?}",
        cfg.device.device_identity,
        cfg.device.baud_rate,
        cfg.device.poll_interval
    );

    run_sensor_test(cfg).map_err(|e| anyhow::anyhow!("sensor test window failed: {e}"))
}
