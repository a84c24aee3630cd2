// src/gui.rs
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotBounds, PlotPoints, VLine};

use crate::config::ViewerConfig;
use crate::drivers::source::wallclock;
use crate::drivers::{
    AcquisitionMode, ChannelSlice, ConnectionStatus, DeviceEntry, FilterParams, JsonLogStore,
    MarkerEdit, MarkerLine, PlotSurface, SessionController, SimulatedDevice, ViewerKind,
};
use crate::engine::{self, StreamHandle, TaskRunner};
use crate::types::*;

const MAX_LOG_LINES: usize = 8;
const COLORS: [Color32; 5] = [
    Color32::from_rgb(0, 255, 255),
    Color32::YELLOW,
    Color32::from_rgb(255, 0, 255),
    Color32::from_rgb(120, 255, 120),
    Color32::from_rgb(255, 160, 60),
];

struct Trace {
    name: &'static str,
    points: Vec<[f64; 2]>,
    visible: bool,
}

/// egui_plot backed surface. Channels are stacked top to bottom, one
/// `2 * y_limit` band each.
pub struct PlotView {
    id: &'static str,
    y_limit: f64,
    max_view: f64,
    traces: Vec<Trace>,
    x_limits: Option<(f64, f64)>,
    forced_view: Option<(f64, f64)>,
    shown: Option<(f64, f64)>,
    markers: Vec<MarkerLine>,
}

/// What the user did to the plot during one frame.
#[derive(Debug, Default)]
struct PlotInput {
    range_changed: Option<(f64, f64)>,
    clicked: Option<f64>,
    secondary_clicked: Option<f64>,
    hover: Option<f64>,
}

impl PlotView {
    fn new(id: &'static str, mode: AcquisitionMode, max_view: f64) -> Self {
        let mut view = Self {
            id,
            y_limit: mode.y_limit_volts(),
            max_view,
            traces: Vec::new(),
            x_limits: None,
            forced_view: None,
            shown: None,
            markers: Vec::new(),
        };
        view.rebuild_channels(mode, max_view);
        view
    }

    fn offset(&self, index: usize) -> f64 {
        (self.traces.len().saturating_sub(index + 1)) as f64 * 2.0 * self.y_limit
    }

    fn y_range(&self) -> (f64, f64) {
        (-self.y_limit, self.offset(0) + self.y_limit)
    }

    fn marker_near(&self, x: f64) -> Option<usize> {
        let (lo, hi) = self.shown?;
        let tolerance = (hi - lo).abs() * 0.01;
        self.markers
            .iter()
            .filter(|line| (line.time - x).abs() <= tolerance)
            .min_by(|a, b| (a.time - x).abs().total_cmp(&(b.time - x).abs()))
            .map(|line| line.index)
    }

    fn marker_line(&self, index: usize) -> Option<&MarkerLine> {
        self.markers.iter().find(|line| line.index == index)
    }

    fn show(&mut self, ui: &mut egui::Ui, selected: Option<usize>) -> PlotInput {
        let forced = self.forced_view.take();
        let (ymin, ymax) = self.y_range();
        let traces = &self.traces;
        let markers = &self.markers;
        let offsets: Vec<f64> = (0..traces.len()).map(|i| self.offset(i)).collect();

        let (bounds, hover, clicked, secondary) = Plot::new(self.id)
            .legend(Legend::default())
            .include_y(ymin)
            .include_y(ymax)
            .show(ui, |plot_ui| {
                if let Some((lo, hi)) = forced {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max([lo, ymin], [hi, ymax]));
                }
                for (i, trace) in traces.iter().enumerate() {
                    if !trace.visible || trace.points.is_empty() {
                        continue;
                    }
                    let points: Vec<[f64; 2]> = trace
                        .points
                        .iter()
                        .map(|[t, v]| [*t, v + offsets[i]])
                        .collect();
                    plot_ui.line(
                        Line::new(PlotPoints::new(points))
                            .name(trace.name)
                            .color(COLORS[i % COLORS.len()]),
                    );
                }
                for line in markers {
                    let color = if selected == Some(line.index) {
                        Color32::WHITE
                    } else {
                        Color32::RED
                    };
                    plot_ui.vline(VLine::new(line.time).name(&line.label).color(color));
                }
                let bounds = plot_ui.plot_bounds();
                let x = plot_ui.pointer_coordinate().map(|p| p.x);
                (
                    (bounds.min()[0], bounds.max()[0]),
                    x,
                    plot_ui.response().clicked(),
                    plot_ui.response().secondary_clicked(),
                )
            })
            .inner;

        let mut input = PlotInput {
            hover,
            clicked: hover.filter(|_| clicked),
            secondary_clicked: hover.filter(|_| secondary),
            ..Default::default()
        };
        match (forced, self.shown) {
            (Some(view), _) => self.shown = Some(view),
            (None, None) => self.shown = Some(bounds),
            (None, Some(shown)) => {
                if (shown.0 - bounds.0).abs() > 1e-9 || (shown.1 - bounds.1).abs() > 1e-9 {
                    let clamped = clamp_view(bounds.0, bounds.1, self.x_limits, self.max_view);
                    if clamped != bounds {
                        self.forced_view = Some(clamped);
                    }
                    self.shown = Some(clamped);
                    input.range_changed = Some(clamped);
                }
            }
        }
        input
    }
}

/// Keeps a user-chosen view no wider than `max_view` and inside `limits`.
fn clamp_view(lo: f64, hi: f64, limits: Option<(f64, f64)>, max_view: f64) -> (f64, f64) {
    let (lo, hi) = if hi - lo > max_view {
        let mid = (lo + hi) / 2.0;
        (mid - max_view / 2.0, mid + max_view / 2.0)
    } else {
        (lo, hi)
    };
    match limits {
        Some((min, max)) => {
            let width = (hi - lo).min(max - min);
            if lo < min {
                (min, min + width)
            } else if hi > max {
                (max - width, max)
            } else {
                (lo, hi)
            }
        }
        None => (lo, hi),
    }
}

impl PlotSurface for PlotView {
    fn rebuild_channels(&mut self, mode: AcquisitionMode, max_view: f64) {
        self.y_limit = mode.y_limit_volts();
        self.max_view = max_view;
        self.traces = mode
            .channel_names()
            .iter()
            .map(|&name| Trace {
                name,
                points: Vec::new(),
                visible: true,
            })
            .collect();
        self.markers.clear();
        self.shown = None;
    }

    fn set_x_limits(&mut self, lo: f64, hi: f64) {
        self.x_limits = Some((lo, hi));
    }

    fn set_visible_range(&mut self, lo: f64, hi: f64) {
        self.forced_view = Some((lo, hi));
    }

    fn set_series(&mut self, slice: &ChannelSlice<'_>, visible: &[bool]) {
        for (i, (trace, (_, values))) in self.traces.iter_mut().zip(slice.channels()).enumerate() {
            trace.visible = visible.get(i).copied().unwrap_or(true);
            trace.points = slice
                .time
                .iter()
                .zip(values)
                .filter(|(_, v)| v.is_finite())
                .map(|(t, v)| [*t, *v])
                .collect();
        }
    }

    fn clear_series(&mut self) {
        for trace in &mut self.traces {
            trace.points.clear();
        }
    }

    fn set_marker_lines(&mut self, lines: &[MarkerLine]) {
        self.markers = lines.to_vec();
    }
}

/// One viewer: its controller, surface and selection.
struct Pane {
    controller: SessionController,
    view: PlotView,
    selected_marker: Option<usize>,
    hover: Option<f64>,
    edit_label: String,
    edit_remark: String,
}

impl Pane {
    fn new(id: &'static str, kind: ViewerKind, mode: AcquisitionMode) -> Self {
        let controller = SessionController::new(kind, mode);
        let view = PlotView::new(id, mode, controller.max_view());
        Self {
            controller,
            view,
            selected_marker: None,
            hover: None,
            edit_label: String::new(),
            edit_remark: String::new(),
        }
    }

    fn select(&mut self, index: Option<usize>) {
        self.selected_marker = index;
        if let Some(marker) = index.and_then(|i| self.controller.markers().get(i)) {
            self.edit_label = marker.label.clone();
            self.edit_remark = marker.remark.clone();
        }
    }

    fn plot(&mut self, ui: &mut egui::Ui) {
        self.controller.render_to(&mut self.view);
        let shift = ui.input(|i| i.modifiers.shift);
        let input = self.view.show(ui, self.selected_marker);
        if let Some((lo, hi)) = input.range_changed {
            self.controller.on_visible_range_changed(lo, hi);
        }
        self.hover = input.hover;
        if let Some(x) = input.clicked {
            if shift {
                let added = self.controller.add_marker(x);
                self.select(added);
            } else {
                let near = self.view.marker_near(x);
                self.select(near);
            }
        }
        if let (Some(x), Some(index)) = (input.secondary_clicked, self.selected_marker) {
            if let Some((lo, hi)) = self.view.marker_line(index).map(|line| line.bounds) {
                self.controller.move_marker(index, x.clamp(lo, hi));
            }
        }
    }

    fn readout(&self, ui: &mut egui::Ui) {
        let Some(x) = self.hover else {
            ui.label("Hover the plot for values.");
            return;
        };
        let mode = self.controller.mode();
        ui.horizontal_wrapped(|ui| {
            for name in mode.channel_names() {
                if !self.controller.is_channel_visible(name) {
                    continue;
                }
                if let Some((t, v)) = self.controller.value_at(name, x) {
                    ui.monospace(format!("{name} @ {t:.3}s: {:.2} µV", v * 1e6));
                }
            }
        });
    }

    fn channel_toggles(&mut self, ui: &mut egui::Ui) {
        let mode = self.controller.mode();
        ui.horizontal_wrapped(|ui| {
            for name in mode.channel_names() {
                let mut visible = self.controller.is_channel_visible(name);
                if ui.checkbox(&mut visible, *name).changed() {
                    self.controller.set_channel_visible(name, visible);
                }
            }
        });
    }

    /// Returns an error message for the log, if any.
    fn marker_panel(&mut self, ui: &mut egui::Ui) -> Option<String> {
        let mut focus = None;
        let mut remove = None;
        let mut select = None;
        egui::ScrollArea::vertical()
            .id_source(self.view.id)
            .max_height(140.0)
            .show(ui, |ui| {
                for (i, marker) in self.controller.markers().iter().enumerate() {
                    ui.horizontal(|ui| {
                        let text = format!("{:.3}s {}", marker.time, marker.label);
                        if ui
                            .selectable_label(self.selected_marker == Some(i), text)
                            .clicked()
                        {
                            select = Some(i);
                        }
                        if ui.small_button("Go").clicked() {
                            focus = Some(i);
                        }
                        if ui.small_button("Del").clicked() {
                            remove = Some(i);
                        }
                    });
                }
            });
        if let Some(i) = select {
            self.select(Some(i));
        }
        if let Some(i) = focus {
            self.controller.focus_marker(i);
            self.select(Some(i));
        }
        if let Some(i) = remove {
            self.controller.remove_marker(i);
            self.select(None);
        }

        let index = self.selected_marker?;
        ui.label("Label");
        ui.text_edit_singleline(&mut self.edit_label);
        ui.label("Remark");
        ui.text_edit_singleline(&mut self.edit_remark);
        if ui.button("Apply").clicked() {
            let edit = MarkerEdit {
                label: Some(self.edit_label.clone()),
                remark: Some(self.edit_remark.clone()),
                ..Default::default()
            };
            if let Err(err) = self.controller.edit_marker(index, edit) {
                return Some(err.to_string());
            }
        }
        ui.label(
            egui::RichText::new("Shift+click adds, right-click moves the selection")
                .small(),
        );
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tab {
    Live,
    Offline,
}

pub struct EegViewApp {
    config: ViewerConfig,
    runner: TaskRunner,
    rx: Receiver<ViewerEvent>,
    tx: Sender<ViewerEvent>,
    stream: Option<StreamHandle>,
    selected_tab: Tab,
    live: Pane,
    offline: Pane,

    status: ConnectionStatus,
    devices: Vec<DeviceEntry>,
    selected_device: Option<String>,
    filter: FilterParams,
    licence_text: String,

    marker_label: String,
    marker_remark: String,
    load_path: String,
    save_name: String,
    log_messages: Vec<String>,
}

impl EegViewApp {
    pub fn new(config: ViewerConfig) -> Self {
        let (tx, rx) = channel();
        let device = Arc::new(SimulatedDevice::new(
            config.simulated_devices.clone(),
            config.sample_rate_hz,
        ));
        let mut runner = TaskRunner::new(device, Arc::new(JsonLogStore), tx.clone());
        let mut log_messages = vec!["eegview ready.".to_owned()];
        for task in [Task::SetFilter(config.filter), Task::Scan] {
            if let Err(err) = runner.submit(task) {
                log_messages.push(format!("> {err}"));
            }
        }

        Self {
            live: Pane::new("live_plot", ViewerKind::Live, config.mode),
            offline: Pane::new("offline_plot", ViewerKind::Offline, config.mode),
            filter: config.filter,
            runner,
            rx,
            tx,
            stream: None,
            selected_tab: Tab::Live,
            status: ConnectionStatus::Disconnected,
            devices: Vec::new(),
            selected_device: None,
            licence_text: String::new(),
            marker_label: "Event".to_owned(),
            marker_remark: String::new(),
            load_path: config.session_path("session").display().to_string(),
            save_name: "session".to_owned(),
            log_messages,
            config,
        }
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > MAX_LOG_LINES {
            self.log_messages.remove(0);
        }
    }

    fn submit(&mut self, task: Task) {
        if let Err(err) = self.runner.submit(task) {
            self.log(&err.to_string());
        }
    }

    fn pump_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                ViewerEvent::Log(s) => self.log(&s),
                ViewerEvent::Samples(batch) => {
                    if let Err(err) = self.live.controller.on_new_sample(batch) {
                        self.log(&err.to_string());
                    }
                }
                ViewerEvent::Marker(marker) => {
                    self.live.controller.on_new_marker(marker);
                }
                ViewerEvent::Connection(status) => {
                    self.status = status;
                    if status == ConnectionStatus::Disconnected {
                        self.live.controller.stop_streaming();
                    }
                }
                ViewerEvent::StreamEnded => {
                    if let Some(handle) = self.stream.take() {
                        handle.stop();
                    }
                    self.live.controller.stop_streaming();
                    self.log("Stream ended");
                }
                ViewerEvent::Task { kind, result } => {
                    self.runner.complete(kind);
                    match result {
                        Ok(outcome) => self.on_task_done(outcome),
                        Err(err) => {
                            if kind == OperationKind::Connect {
                                self.status = ConnectionStatus::Disconnected;
                            }
                            self.log(&format!("{kind} failed: {err}"));
                        }
                    }
                }
            }
        }
    }

    fn on_task_done(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Scanned(devices) => {
                self.log(&format!("Found {} device(s)", devices.len()));
                if self.selected_device.is_none() {
                    self.selected_device = devices.iter().find(|d| d.valid).map(|d| d.name.clone());
                }
                self.devices = devices;
            }
            TaskOutcome::Connected { name, ok } => {
                if ok {
                    self.status = ConnectionStatus::Connected;
                    self.log(&format!("Connected to {name}"));
                    self.submit(Task::GetFilter);
                } else {
                    self.status = ConnectionStatus::Disconnected;
                    self.log(&format!("{name} refused the connection"));
                }
            }
            TaskOutcome::Disconnected => {
                self.status = ConnectionStatus::Disconnected;
                self.log("Disconnected");
            }
            TaskOutcome::Filter(params) => self.filter = params,
            TaskOutcome::FilterSet => self.log("Filter updated"),
            TaskOutcome::Licence(keys) => self.licence_text = keys.join("\n"),
            TaskOutcome::LicenceSet => self.log("Licence updated"),
            TaskOutcome::Loaded { path, log } => match self.offline.controller.load_offline(log) {
                Ok(()) => {
                    self.offline.select(None);
                    self.selected_tab = Tab::Offline;
                    self.log(&format!("Loaded {}", path.display()));
                }
                Err(err) => self.log(&format!("Cannot load {}: {err}", path.display())),
            },
            TaskOutcome::Saved(path) => self.log(&format!("Saved {}", path.display())),
        }
    }

    fn start_stream(&mut self) {
        if self.status != ConnectionStatus::Connected {
            self.log("Connect first.");
            return;
        }
        let mode = self.live.controller.mode();
        match self.runner.device().subscribe(mode) {
            Ok(source) => {
                if self.live.controller.start_streaming() {
                    self.stream = Some(engine::spawn_stream(
                        source,
                        self.config.flush_interval_s,
                        self.tx.clone(),
                    ));
                }
            }
            Err(err) => self.log(&err.to_string()),
        }
    }

    fn stop_stream(&mut self) {
        if let Some(handle) = self.stream.take() {
            handle.stop();
            // deliver the final flush before the viewer stops accepting data
            self.pump_events();
        }
        self.live.controller.stop_streaming();
    }

    fn set_live_mode(&mut self, mode: AcquisitionMode) {
        let restart = self.stream.is_some();
        self.stop_stream();
        self.live.controller.set_mode(mode);
        self.live.select(None);
        if restart {
            self.start_stream();
        }
    }

    fn save(&mut self, tab: Tab) {
        let pane = match tab {
            Tab::Live => &self.live,
            Tab::Offline => &self.offline,
        };
        match pane.controller.save_offline(wallclock()) {
            Ok(log) => {
                let path = self.config.session_path(&self.save_name);
                self.submit(Task::Save(path, log));
            }
            Err(err) => self.log(&err.to_string()),
        }
    }

    fn device_panel(&mut self, ui: &mut egui::Ui) {
        ui.label(format!("Status: {}", self.status.label()));
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.runner.is_busy(OperationKind::Scan), egui::Button::new("SCAN"))
                .clicked()
            {
                self.submit(Task::Scan);
            }
            let selected = self.selected_device.clone().unwrap_or_default();
            egui::ComboBox::from_id_source("device")
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    for device in &self.devices {
                        ui.add_enabled_ui(device.valid, |ui| {
                            ui.selectable_value(
                                &mut self.selected_device,
                                Some(device.name.clone()),
                                device.name.as_str(),
                            );
                        });
                    }
                });
        });

        let connected = self.status == ConnectionStatus::Connected;
        let btn_txt = if connected { "DISCONNECT" } else { "CONNECT" };
        let busy = self.runner.is_busy(OperationKind::Connect)
            || self.runner.is_busy(OperationKind::Disconnect);
        if ui.add_enabled(!busy, egui::Button::new(btn_txt)).clicked() {
            if connected {
                self.stop_stream();
                self.status = ConnectionStatus::Disconnecting;
                self.submit(Task::Disconnect);
            } else if let Some(name) = self.selected_device.clone() {
                self.status = ConnectionStatus::Connecting;
                self.submit(Task::Connect(name));
            } else {
                self.log("No device selected");
            }
        }

        ui.collapsing("Filter", |ui| {
            ui.add(egui::DragValue::new(&mut self.filter.lowpass).prefix("LP "));
            ui.add(egui::DragValue::new(&mut self.filter.highpass).prefix("HP "));
            ui.add(egui::DragValue::new(&mut self.filter.notch_low).prefix("Notch "));
            ui.add(egui::DragValue::new(&mut self.filter.notch_high).prefix("to "));
            ui.horizontal(|ui| {
                if ui.button("Read").clicked() {
                    self.submit(Task::GetFilter);
                }
                if ui.button("Write").clicked() {
                    self.submit(Task::SetFilter(self.filter));
                }
            });
        });
        ui.collapsing("Licence", |ui| {
            ui.text_edit_multiline(&mut self.licence_text);
            ui.horizontal(|ui| {
                if ui.button("Read").clicked() {
                    self.submit(Task::GetLicence);
                }
                if ui.button("Write").clicked() {
                    let keys = self
                        .licence_text
                        .lines()
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(str::to_owned)
                        .collect();
                    self.submit(Task::SetLicence(keys));
                }
            });
        });
    }

    fn live_panel(&mut self, ui: &mut egui::Ui) {
        let mut mode = self.live.controller.mode();
        egui::ComboBox::from_id_source("mode")
            .selected_text(mode.label())
            .show_ui(ui, |ui| {
                for m in AcquisitionMode::ALL {
                    ui.selectable_value(&mut mode, m, m.label());
                }
            });
        if mode != self.live.controller.mode() {
            self.set_live_mode(mode);
        }

        let streaming = self.stream.is_some();
        let stream_btn = if streaming { "STOP STREAM" } else { "START STREAM" };
        if ui.button(stream_btn).clicked() {
            if streaming {
                self.stop_stream();
            } else {
                self.start_stream();
            }
        }

        ui.separator();
        ui.label("MARKER");
        ui.text_edit_singleline(&mut self.marker_label);
        ui.text_edit_singleline(&mut self.marker_remark);
        if ui
            .add_enabled(streaming, egui::Button::new("ADD MARKER"))
            .clicked()
        {
            if let Some(handle) = &self.stream {
                let id = self.live.controller.markers().generate_unique_id();
                handle.send_marker(id, self.marker_label.clone(), self.marker_remark.clone());
            }
        }
        ui.horizontal(|ui| {
            if ui.button("CLEAR").clicked() {
                self.live.controller.clear();
                self.live.select(None);
            }
            if ui.add_enabled(!streaming, egui::Button::new("SAVE")).clicked() {
                self.save(Tab::Live);
            }
        });
    }

    fn offline_panel(&mut self, ui: &mut egui::Ui) {
        ui.label("Session file");
        ui.text_edit_singleline(&mut self.load_path);
        if ui
            .add_enabled(!self.runner.is_busy(OperationKind::Load), egui::Button::new("LOAD"))
            .clicked()
        {
            let path = PathBuf::from(self.load_path.trim());
            self.submit(Task::Load(path));
        }
        ui.horizontal(|ui| {
            if ui.button("|< START").clicked() {
                self.offline.controller.goto_start();
            }
            if ui.button("END >|").clicked() {
                self.offline.controller.goto_end();
            }
        });
        if ui
            .add_enabled(!self.runner.is_busy(OperationKind::Save), egui::Button::new("SAVE"))
            .clicked()
        {
            self.save(Tab::Offline);
        }
    }
}

impl eframe::App for EegViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_events();
        if self.stream.is_some() {
            ctx.request_repaint();
        } else {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);

        egui::SidePanel::left("L").min_width(300.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("eegview");
            ui.separator();
            self.device_panel(ui);
            ui.separator();

            let tab = self.selected_tab;
            match tab {
                Tab::Live => self.live_panel(ui),
                Tab::Offline => self.offline_panel(ui),
            }
            ui.label("Save as");
            ui.text_edit_singleline(&mut self.save_name);

            ui.separator();
            ui.label("MARKERS");
            let pane = match tab {
                Tab::Live => &mut self.live,
                Tab::Offline => &mut self.offline,
            };
            if let Some(err) = pane.marker_panel(ui) {
                self.log(&err);
            }

            ui.add_space(10.0);
            egui::ScrollArea::vertical()
                .id_source("log")
                .max_height(100.0)
                .show(ui, |ui| {
                    for m in &self.log_messages {
                        ui.monospace(m);
                    }
                });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.selected_tab, Tab::Live, "Live");
                ui.selectable_value(&mut self.selected_tab, Tab::Offline, "Offline");
            });
            let pane = match self.selected_tab {
                Tab::Live => &mut self.live,
                Tab::Offline => &mut self.offline,
            };
            pane.channel_toggles(ui);
            pane.readout(ui);
            pane.plot(ui);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Some(handle) = self.stream.take() {
            handle.stop();
        }
    }
}
