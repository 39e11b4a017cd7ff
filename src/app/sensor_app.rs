use std::time::Duration;

use eframe::egui;
use egui::{Color32, RichText};
use egui_phosphor::regular::{GAUGE, PLUGS, PLUGS_CONNECTED};
use egui_plot::{Bar, BarChart, Plot};
use log::{error, info};

use crate::readings::PRESSURE_RANGE;
use crate::session::SensorSession;
use crate::transport::{PortOpener, SerialOpener};

const CONNECT_FILL: Color32 = Color32::from_rgb(0x66, 0xBB, 0x6A);
const DISCONNECT_FILL: Color32 = Color32::from_rgb(0xEF, 0x53, 0x50);
const CALIBRATE_FILL: Color32 = Color32::from_rgb(0xE0, 0xE0, 0xE0);
const BAR_COLOR: Color32 = Color32::from_rgb(0x42, 0xA5, 0xF5);
const BUTTON_SIZE: [f32; 2] = [150.0, 40.0];

/// Display name of channel `index` (zero based).
pub fn sensor_name(index: usize) -> String {
    format!("Sensor {}", index + 1)
}

pub fn voltage_text(mv: i64) -> String {
    format!("{mv} mV")
}

/// Frame bookkeeping around the blocking scan, keyed by
/// `Context::cumulative_frame_nr`.
///
/// A click in frame `n` leaves frame `n + 1` to paint the disabled button;
/// the scan runs at the end of frame `n + 2`. Clicks that queued up while
/// the UI thread was blocked arrive in the frame after that and are dropped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConnectGate {
    requested: Option<u64>,
    settled: Option<u64>,
}

impl ConnectGate {
    pub(crate) fn pending(&self) -> bool {
        self.requested.is_some()
    }

    /// Whether a click on the connect button in frame `now` counts.
    pub(crate) fn accepts_click(&self, now: u64) -> bool {
        !self.pending() && self.settled.is_none_or(|done| now > done + 1)
    }

    pub(crate) fn request(&mut self, now: u64) {
        if self.accepts_click(now) {
            self.requested = Some(now);
        }
    }

    /// True once a full frame with the disabled button has been shown.
    pub(crate) fn due(&self, now: u64) -> bool {
        self.requested.is_some_and(|clicked| now > clicked + 1)
    }

    pub(crate) fn finish(&mut self, now: u64) {
        self.requested = None;
        self.settled = Some(now);
    }
}

/// Window state. Everything shown is read from the session snapshot each
/// frame; the app itself only tracks the connect click.
pub struct SensorTestApp<O: PortOpener + 'static = SerialOpener> {
    session: SensorSession<O>,
    connect: ConnectGate,
}

impl<O: PortOpener + 'static> SensorTestApp<O> {
    pub fn new(session: SensorSession<O>) -> Self {
        Self {
            session,
            connect: ConnectGate::default(),
        }
    }

    pub fn session(&self) -> &SensorSession<O> {
        &self.session
    }

    fn render_buttons(&mut self, ui: &mut egui::Ui) {
        let now = ui.ctx().cumulative_frame_nr();
        let pending = self.connect.pending();
        let connected = self.session.is_connected();
        ui.horizontal(|ui| {
            let (label, fill, text_color) = if connected {
                (format!("{PLUGS} DISCONNECT"), DISCONNECT_FILL, Color32::WHITE)
            } else {
                (format!("{PLUGS_CONNECTED} CONNECT"), CONNECT_FILL, Color32::BLACK)
            };
            let connect = egui::Button::new(RichText::new(label).color(text_color))
                .fill(fill)
                .corner_radius(20.0)
                .min_size(BUTTON_SIZE.into());
            let clicked = ui.add_enabled(!pending, connect).clicked();
            if clicked && self.connect.accepts_click(now) {
                if connected {
                    self.session.disconnect();
                } else {
                    self.connect.request(now);
                    ui.ctx().request_repaint();
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let calibrate = egui::Button::new(
                    RichText::new(format!("{GAUGE} CALIBRATE")).color(Color32::BLACK),
                )
                .fill(CALIBRATE_FILL)
                .corner_radius(20.0)
                .min_size(BUTTON_SIZE.into());
                if ui.add_enabled(connected, calibrate).clicked() {
                    match self.session.calibrate() {
                        Ok(()) => info!("calibration requested"),
                        Err(e) => error!("calibration failed: {e}"),
                    }
                }
            });
        });
    }

    fn render_chart(&self, ui: &mut egui::Ui) {
        let pressures = &self.session.snapshot().pressures;
        let bars: Vec<Bar> = pressures
            .iter()
            .enumerate()
            .map(|(i, &p)| Bar::new(i as f64, p).name(sensor_name(i)).width(0.6))
            .collect();
        let n = pressures.len();

        ui.vertical_centered(|ui| ui.heading("Sensor Readings"));
        Plot::new("sensor_bars")
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .allow_boxed_zoom(false)
            .show_x(false)
            .y_axis_label("Pressure (%)")
            .x_axis_formatter(move |mark, _range| {
                let i = mark.value.round();
                if (mark.value - i).abs() < 1e-6 && i >= 0.0 && (i as usize) < n {
                    sensor_name(i as usize)
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.set_plot_bounds_x(-0.5..=n as f64 - 0.5);
                plot_ui.set_plot_bounds_y(PRESSURE_RANGE.0..=PRESSURE_RANGE.1);
                plot_ui.bar_chart(BarChart::new("Sensor Readings", bars).color(BAR_COLOR));
            });
    }

    fn render_voltages(&self, ui: &mut egui::Ui) {
        let voltages = &self.session.snapshot().voltages_mv;
        egui::Grid::new("voltage_labels")
            .num_columns(voltages.len())
            .spacing([40.0, 6.0])
            .show(ui, |ui| {
                for i in 0..voltages.len() {
                    ui.label(RichText::new(sensor_name(i)).strong());
                }
                ui.end_row();
                for &mv in voltages {
                    ui.label(voltage_text(mv));
                }
                ui.end_row();
            });
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        let snap = self.session.snapshot();
        ui.horizontal(|ui| {
            if self.connect.pending() {
                ui.spinner();
                ui.label("Searching for device…");
                return;
            }
            ui.label(&snap.status_message);
            if let Some(port) = &snap.port {
                ui.separator();
                ui.label(port);
            }
            if let Some(t) = snap.last_update {
                ui.separator();
                ui.label(format!("last reading {}", t.format("%H:%M:%S%.3f")));
            }
            if snap.malformed_count > 0 {
                ui.separator();
                ui.label(format!("{} malformed", snap.malformed_count));
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// eframe integration
// ─────────────────────────────────────────────────────────────────────────────

impl<O: PortOpener + 'static> eframe::App for SensorTestApp<O> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.session.process_events();

        egui::TopBottomPanel::top("sensor_buttons").show(ctx, |ui| {
            ui.add_space(8.0);
            self.render_buttons(ui);
            ui.add_space(8.0);
        });

        egui::TopBottomPanel::bottom("sensor_status").show(ctx, |ui| {
            self.render_status(ui);
        });

        egui::TopBottomPanel::bottom("sensor_voltages").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.vertical_centered(|ui| self.render_voltages(ui));
            ui.add_space(6.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_chart(ui);
        });

        // Runs after the panels so the frame still gets painted afterwards.
        let now = ctx.cumulative_frame_nr();
        if self.connect.due(now) {
            if let Err(e) = self.session.connect() {
                error!("connect failed: {e}");
            }
            self.connect.finish(now);
        }

        if self.connect.pending() {
            ctx.request_repaint();
        } else {
            let period = self.session.config().poll_interval.max(Duration::from_millis(16));
            ctx.request_repaint_after(period);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_one_based() {
        assert_eq!(sensor_name(0), "Sensor 1");
        assert_eq!(sensor_name(4), "Sensor 5");
    }

    #[test]
    fn voltage_text_has_unit() {
        assert_eq!(voltage_text(1652), "1652 mV");
    }

    #[test]
    fn scan_waits_for_a_frame_with_the_button_disabled() {
        let mut gate = ConnectGate::default();
        gate.request(10);

        assert!(gate.pending());
        assert!(!gate.due(10), "the click frame still shows an enabled button");
        assert!(!gate.due(11), "frame 11 paints the disabled button");
        assert!(gate.due(12));
    }

    #[test]
    fn double_click_starts_one_connect() {
        let mut gate = ConnectGate::default();
        gate.request(10);
        assert!(!gate.accepts_click(10));
        gate.request(10);
        assert_eq!(gate.requested, Some(10));

        gate.finish(12);
        assert!(!gate.accepts_click(13), "clicks queued during the scan are dropped");
        assert!(gate.accepts_click(14));
    }
}
