//! Top-level entry point for running the sensor test window.

use eframe::egui;

use crate::config::SensorTestConfig;
use crate::session::SensorSession;
use crate::transport::SerialOpener;

use super::sensor_app::SensorTestApp;

/// Open the sensor test window on real serial ports.
///
/// Blocks until the window is closed. Any open connection is closed when the
/// app is dropped.
pub fn run_sensor_test(mut cfg: SensorTestConfig) -> eframe::Result<()> {
    let session = SensorSession::new(cfg.device.clone(), SerialOpener);
    let app = SensorTestApp::new(session);

    let title = cfg.title.clone();
    let mut opts = cfg
        .native_options
        .take()
        .unwrap_or_else(eframe::NativeOptions::default);

    if opts.viewport.inner_size.is_none() {
        opts.viewport = opts
            .viewport
            .clone()
            .with_inner_size(egui::vec2(800.0, 600.0));
    }

    eframe::run_native(
        &title,
        opts,
        Box::new(|cc| {
            let mut fonts = egui::FontDefinitions::default();
            egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
            cc.egui_ctx.set_fonts(fonts);
            Ok(Box::new(app))
        }),
    )
}
