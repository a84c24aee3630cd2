use std::collections::BTreeMap;

use crate::drivers::buffer::{ChannelBuffer, ChannelSlice, SampleBatch};
use crate::drivers::log_store::SessionLog;
use crate::drivers::markers::{Marker, MarkerEdit, MarkerLog};
use crate::drivers::mode::AcquisitionMode;
use crate::drivers::window::{WindowManager, WindowPolicy};
use crate::drivers::ViewerError;

/// Seconds shown at most at once by the live viewer.
pub const LIVE_MAX_VIEW: f64 = 5.0;
/// Seconds shown at most at once by the offline viewer.
pub const OFFLINE_MAX_VIEW: f64 = 30.0;

const CLICK_MARKER_LABEL: &str = "Event";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerKind {
    Live,
    Offline,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamState {
    #[default]
    Stopped,
    Streaming,
}

/// Vertical marker line as drawn by the surface, with its drag limits.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerLine {
    pub index: usize,
    pub id: String,
    pub time: f64,
    pub label: String,
    pub bounds: (f64, f64),
}

/// Rendering capability the controller drives. Holds all widget state.
pub trait PlotSurface {
    /// Replaces all line series with one per channel of `mode`.
    fn rebuild_channels(&mut self, mode: AcquisitionMode, max_view: f64);
    fn set_x_limits(&mut self, lo: f64, hi: f64);
    fn set_visible_range(&mut self, lo: f64, hi: f64);
    /// Replaces series data; `visible[i]` follows `slice.channels()` order.
    fn set_series(&mut self, slice: &ChannelSlice<'_>, visible: &[bool]);
    fn clear_series(&mut self);
    fn set_marker_lines(&mut self, lines: &[MarkerLine]);
}

#[derive(Clone, Debug, Default, PartialEq)]
struct PendingUpdates {
    rebuild: bool,
    x_limits: Option<(f64, f64)>,
    visible: Option<(f64, f64)>,
    series: bool,
    markers: bool,
}

/// Coordinates buffer, markers and window for one viewer.
///
/// Owned by the UI thread. Surface changes are queued and handed over by
/// [`SessionController::render_to`].
#[derive(Debug)]
pub struct SessionController {
    kind: ViewerKind,
    state: StreamState,
    buffer: ChannelBuffer,
    markers: MarkerLog,
    window: WindowManager,
    view: Option<(f64, f64)>,
    /// View width the user chose; navigation and live follow keep it.
    span: f64,
    visible: Vec<bool>,
    pending: PendingUpdates,
}

impl SessionController {
    pub fn new(kind: ViewerKind, mode: AcquisitionMode) -> Self {
        let policy = match kind {
            ViewerKind::Live => WindowPolicy::live(),
            ViewerKind::Offline => WindowPolicy::offline(),
        };
        Self::with_policy(kind, mode, policy)
    }

    pub fn with_policy(kind: ViewerKind, mode: AcquisitionMode, policy: WindowPolicy) -> Self {
        let span = match kind {
            ViewerKind::Live => LIVE_MAX_VIEW,
            ViewerKind::Offline => OFFLINE_MAX_VIEW,
        };
        Self {
            kind,
            state: StreamState::Stopped,
            buffer: ChannelBuffer::new(mode),
            markers: MarkerLog::new(),
            window: WindowManager::new(policy),
            view: None,
            span,
            visible: vec![true; mode.channel_count()],
            pending: PendingUpdates {
                rebuild: true,
                ..Default::default()
            },
        }
    }

    pub fn live(mode: AcquisitionMode) -> Self {
        Self::new(ViewerKind::Live, mode)
    }

    pub fn offline(mode: AcquisitionMode) -> Self {
        Self::new(ViewerKind::Offline, mode)
    }

    pub fn kind(&self) -> ViewerKind {
        self.kind
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.buffer.mode()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == StreamState::Streaming
    }

    pub fn buffer(&self) -> &ChannelBuffer {
        &self.buffer
    }

    pub fn markers(&self) -> &MarkerLog {
        &self.markers
    }

    pub fn window(&self) -> &WindowManager {
        &self.window
    }

    pub fn visible_range(&self) -> Option<(f64, f64)> {
        self.view
    }

    pub fn max_view(&self) -> f64 {
        match self.kind {
            ViewerKind::Live => LIVE_MAX_VIEW,
            ViewerKind::Offline => OFFLINE_MAX_VIEW,
        }
    }

    /// `(first, last)` sample time.
    pub fn data_range(&self) -> Option<(f64, f64)> {
        Some((self.buffer.first_time()?, self.buffer.last_time()?))
    }

    /// Only the live viewer streams; returns whether streaming is now on.
    pub fn start_streaming(&mut self) -> bool {
        if self.kind == ViewerKind::Live {
            self.state = StreamState::Streaming;
            log::info!("streaming {}", self.mode());
        }
        self.is_streaming()
    }

    pub fn stop_streaming(&mut self) {
        if self.is_streaming() {
            log::info!("streaming stopped with {} samples", self.buffer.len());
        }
        self.state = StreamState::Stopped;
    }

    /// Switches the channel layout, dropping samples and markers.
    pub fn set_mode(&mut self, mode: AcquisitionMode) {
        self.stop_streaming();
        self.buffer.reset(mode);
        self.markers.clear();
        self.window.reset();
        self.view = None;
        self.span = self.max_view();
        self.visible = vec![true; mode.channel_count()];
        self.pending = PendingUpdates {
            rebuild: true,
            series: true,
            markers: true,
            ..Default::default()
        };
        log::info!("acquisition mode set to {mode}");
    }

    /// Drops all data but keeps the mode.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.markers.clear();
        self.window.reset();
        self.view = None;
        self.pending.series = true;
        self.pending.markers = true;
    }

    /// Replaces the session with a stored log.
    ///
    /// The log is validated before anything is touched. Channels the mode
    /// does not know are dropped, a known channel absent from the log reads
    /// as NaN, and all columns are cut to the shortest one present.
    pub fn load_offline(&mut self, session: SessionLog) -> Result<(), ViewerError> {
        if self.is_streaming() {
            return Err(ViewerError::StreamingActive);
        }
        let mode = AcquisitionMode::from_label(&session.mode)
            .ok_or_else(|| ViewerError::UnknownMode(session.mode.clone()))?;
        if session.time.is_empty() {
            return Err(ViewerError::MissingTimeData);
        }

        let SessionLog {
            mut time,
            mut channels,
            markers,
            ..
        } = session;
        for name in channels.keys() {
            if mode.channel_index(name).is_none() {
                log::debug!("ignoring channel {name} not part of {mode}");
            }
        }
        let len = mode
            .channel_names()
            .iter()
            .filter_map(|name| channels.get(*name).map(Vec::len))
            .fold(time.len(), usize::min);
        if len == 0 {
            return Err(ViewerError::MissingTimeData);
        }
        time.truncate(len);
        let per_channel = mode
            .channel_names()
            .iter()
            .map(|name| match channels.remove(*name) {
                Some(mut column) => {
                    column.truncate(len);
                    column
                }
                None => {
                    log::warn!("log has no {name} column, filling with NaN");
                    vec![f64::NAN; len]
                }
            })
            .collect();
        let buffer = ChannelBuffer::from_columns(mode, time, per_channel)?;

        if mode != self.mode() {
            self.set_mode(mode);
        }
        self.buffer = buffer;
        self.markers = MarkerLog::from_markers(markers);
        self.window.reset();
        self.pending.series = true;
        self.pending.markers = true;
        if let Some((first, last)) = self.data_range() {
            self.pending.x_limits = Some(x_limits(first, last));
            self.show_range(first, last.min(first + OFFLINE_MAX_VIEW));
        }
        log::info!(
            "loaded {} samples and {} markers in {mode}",
            self.buffer.len(),
            self.markers.len()
        );
        Ok(())
    }

    /// Snapshot for persisting, with `anchor` chosen so the last sample is
    /// stamped `now`.
    pub fn save_offline(&self, now: f64) -> Result<SessionLog, ViewerError> {
        if self.is_streaming() {
            return Err(ViewerError::StreamingActive);
        }
        let last = self.buffer.last_time().ok_or(ViewerError::EmptySession)?;
        let channels: BTreeMap<String, Vec<f64>> = self
            .mode()
            .channel_names()
            .iter()
            .filter_map(|name| Some((name.to_string(), self.buffer.channel(name)?.to_vec())))
            .collect();
        Ok(SessionLog {
            mode: self.mode().label().to_owned(),
            anchor: now - last,
            time: self.buffer.times().to_vec(),
            channels,
            markers: self.markers.as_slice().to_vec(),
        })
    }

    /// The user panned or zoomed the view to `[lo, hi]`.
    pub fn on_visible_range_changed(&mut self, lo: f64, hi: f64) {
        if hi > lo {
            self.span = hi - lo;
        }
        self.apply_view(lo, hi);
    }

    fn apply_view(&mut self, lo: f64, hi: f64) {
        self.view = Some((lo, hi));
        let before = self.window.bounds();
        self.window.on_visible_range(&self.buffer, lo, hi);
        if self.window.bounds() != before {
            self.pending.series = true;
            self.pending.markers = true;
        }
    }

    /// Applies a flushed batch. The live viewer drops batches while stopped.
    pub fn on_new_sample(&mut self, batch: SampleBatch) -> Result<(), ViewerError> {
        if self.kind == ViewerKind::Live && !self.is_streaming() {
            return Ok(());
        }
        if batch.is_empty() {
            return Ok(());
        }
        let last_before = self.buffer.last_time();
        if let Err(err) = self.buffer.append_batch(&batch) {
            log::warn!("dropping {} samples: {err}", batch.len());
            return Err(err);
        }
        let (Some((first, last)), Some(new_last)) = (self.data_range(), self.buffer.last_index())
        else {
            return Ok(());
        };
        self.pending.x_limits = Some(x_limits(first, last));

        let follow = match self.view {
            Some((_, vhi)) => self.window.should_follow(last_before, vhi),
            None => true,
        };
        if self.window.on_data_appended(follow, new_last).is_some() {
            self.pending.series = true;
        }
        if follow {
            let lo = (last - self.span).max(first);
            self.apply_view(lo, last);
            self.pending.visible = self.view;
        }
        Ok(())
    }

    /// Streamed marker; appended as it comes. Ignored by a stopped live viewer.
    pub fn on_new_marker(&mut self, marker: Marker) -> Option<usize> {
        if self.kind == ViewerKind::Live && !self.is_streaming() {
            return None;
        }
        let index = self.markers.push(marker);
        self.pending.markers = true;
        Some(index)
    }

    /// Inserts an "Event" marker at the sample nearest to `time`.
    pub fn add_marker(&mut self, time: f64) -> Option<usize> {
        let snapped = self.buffer.nearest(time)?.time;
        let id = self.markers.generate_unique_id();
        let index = self
            .markers
            .insert_ordered(Marker::new(id, snapped, CLICK_MARKER_LABEL));
        self.pending.markers = true;
        Some(index)
    }

    pub fn edit_marker(&mut self, index: usize, edit: MarkerEdit) -> Result<bool, ViewerError> {
        let changed = self.markers.edit(index, edit)?;
        self.pending.markers |= changed;
        Ok(changed)
    }

    pub fn remove_marker(&mut self, index: usize) -> Option<Marker> {
        let removed = self.markers.remove(index);
        self.pending.markers |= removed.is_some();
        removed
    }

    /// Drag of a marker line: snaps to the nearest sample, keeps list order.
    pub fn move_marker(&mut self, index: usize, time: f64) -> Option<f64> {
        let snapped = self.buffer.nearest(time)?.time;
        let edit = MarkerEdit {
            time: Some(snapped),
            ..Default::default()
        };
        match self.markers.edit(index, edit) {
            Ok(true) => {
                self.pending.markers = true;
                Some(snapped)
            }
            _ => None,
        }
    }

    /// Centres the view on a marker, kept inside the data.
    pub fn focus_marker(&mut self, index: usize) -> bool {
        let (Some(marker), Some((first, last))) = (self.markers.get(index), self.data_range())
        else {
            return false;
        };
        let hi = (marker.time + self.span / 2.0).min(last);
        let lo = (hi - self.span).max(first);
        self.show_range(lo, hi);
        true
    }

    pub fn goto_start(&mut self) -> bool {
        let Some((first, _)) = self.data_range() else {
            return false;
        };
        self.show_range(first, first + self.span);
        true
    }

    pub fn goto_end(&mut self) -> bool {
        let Some((_, last)) = self.data_range() else {
            return false;
        };
        self.show_range(last - self.span, last);
        true
    }

    /// Hover readout: `(sample time, value)` of `channel` nearest to `time`.
    pub fn value_at(&self, channel: &str, time: f64) -> Option<(f64, f64)> {
        let sample = self.buffer.nearest(time)?;
        let value = *self.buffer.channel(channel)?.get(sample.index)?;
        Some((sample.time, value))
    }

    pub fn set_channel_visible(&mut self, channel: &str, visible: bool) -> bool {
        let Some(idx) = self.mode().channel_index(channel) else {
            return false;
        };
        if self.visible[idx] != visible {
            self.visible[idx] = visible;
            self.pending.series = true;
        }
        true
    }

    pub fn is_channel_visible(&self, channel: &str) -> bool {
        self.mode()
            .channel_index(channel)
            .map_or(false, |idx| self.visible[idx])
    }

    /// Slice currently pushed to the surface.
    pub fn materialized_window(&self) -> Option<ChannelSlice<'_>> {
        let (lo, hi) = self.window.bounds()?;
        self.buffer.slice(lo, hi)
    }

    /// Marker lines inside the materialized time range.
    pub fn marker_lines(&self) -> Vec<MarkerLine> {
        let (Some(slice), Some((first, last))) = (self.materialized_window(), self.data_range())
        else {
            return Vec::new();
        };
        let (Some(&lo), Some(&hi)) = (slice.time.first(), slice.time.last()) else {
            return Vec::new();
        };
        self.markers
            .in_range(lo, hi)
            .map(|(index, m)| MarkerLine {
                index,
                id: m.id.clone(),
                time: m.time,
                label: m.label.clone(),
                bounds: self
                    .markers
                    .drag_bounds(index, first, last)
                    .unwrap_or((first, last)),
            })
            .collect()
    }

    /// Hands queued changes to the surface, in dependency order.
    pub fn render_to<S: PlotSurface + ?Sized>(&mut self, surface: &mut S) {
        let pending = std::mem::take(&mut self.pending);
        if pending.rebuild {
            surface.rebuild_channels(self.mode(), self.max_view());
        }
        if let Some((lo, hi)) = pending.x_limits {
            surface.set_x_limits(lo, hi);
        }
        if let Some((lo, hi)) = pending.visible {
            surface.set_visible_range(lo, hi);
        }
        if pending.series || pending.rebuild {
            match self.materialized_window() {
                Some(slice) => surface.set_series(&slice, &self.visible),
                None => surface.clear_series(),
            }
        }
        if pending.markers || pending.series || pending.rebuild {
            surface.set_marker_lines(&self.marker_lines());
        }
    }

    fn show_range(&mut self, lo: f64, hi: f64) {
        let (lo, hi) = match self.data_range() {
            Some((first, last)) => (lo.max(first), hi.min(last).max(lo.max(first))),
            None => (lo, hi),
        };
        self.pending.visible = Some((lo, hi));
        self.apply_view(lo, hi);
    }
}

/// Horizontal pan limits; a short recording still gets one second of room.
fn x_limits(first: f64, last: f64) -> (f64, f64) {
    if last - first > 1.0 {
        (first, last)
    } else {
        (first, first + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct RecordingSurface {
        rebuilt: Vec<(AcquisitionMode, f64)>,
        x_limits: Option<(f64, f64)>,
        visible: Option<(f64, f64)>,
        series_len: Option<usize>,
        shown_channels: Vec<&'static str>,
        lines: Vec<MarkerLine>,
        series_updates: usize,
    }

    impl PlotSurface for RecordingSurface {
        fn rebuild_channels(&mut self, mode: AcquisitionMode, max_view: f64) {
            self.rebuilt.push((mode, max_view));
        }
        fn set_x_limits(&mut self, lo: f64, hi: f64) {
            self.x_limits = Some((lo, hi));
        }
        fn set_visible_range(&mut self, lo: f64, hi: f64) {
            self.visible = Some((lo, hi));
        }
        fn set_series(&mut self, slice: &ChannelSlice<'_>, visible: &[bool]) {
            self.series_updates += 1;
            self.series_len = Some(slice.len());
            self.shown_channels = slice
                .channels()
                .zip(visible)
                .filter(|(_, v)| **v)
                .map(|((name, _), _)| name)
                .collect();
        }
        fn clear_series(&mut self) {
            self.series_len = None;
        }
        fn set_marker_lines(&mut self, lines: &[MarkerLine]) {
            self.lines = lines.to_vec();
        }
    }

    fn batch(mode: AcquisitionMode, times: impl IntoIterator<Item = f64>) -> SampleBatch {
        let mut batch = SampleBatch::new(mode);
        for t in times {
            batch.push(t, &vec![t; mode.channel_count()]).unwrap();
        }
        batch
    }

    fn offline_log(mode: AcquisitionMode, n: usize, step: f64) -> SessionLog {
        let time: Vec<f64> = (0..n).map(|i| i as f64 * step).collect();
        let channels = mode
            .channel_names()
            .iter()
            .enumerate()
            .map(|(c, name)| {
                let column = time.iter().map(|t| t * 1e-3 + c as f64 * 1e-4).collect();
                (name.to_string(), column)
            })
            .collect();
        SessionLog {
            mode: mode.label().to_owned(),
            anchor: 0.0,
            time,
            channels,
            markers: Vec::new(),
        }
    }

    #[test]
    fn ten_thousand_samples_then_mode_switch() {
        let mode = AcquisitionMode::CommonReference;
        let mut ctl = SessionController::offline(mode);
        ctl.load_offline(offline_log(mode, 10_000, 0.1)).unwrap();
        let found = ctl.buffer().nearest(500.03).unwrap();
        assert_eq!(found.index, 5000);
        assert!((found.time - 500.0).abs() < 1e-9);

        let mut surface = RecordingSurface::default();
        ctl.render_to(&mut surface);
        ctl.set_mode(AcquisitionMode::TransverseBipolar);
        ctl.render_to(&mut surface);
        assert!(ctl.buffer().is_empty());
        assert_eq!(
            surface.rebuilt.last(),
            Some(&(AcquisitionMode::TransverseBipolar, OFFLINE_MAX_VIEW))
        );
        assert_eq!(ctl.mode().channel_count(), 5);
        assert_eq!(surface.series_len, None);
    }

    #[test]
    fn load_sets_initial_view_and_materializes() {
        let mode = AcquisitionMode::LongitudinalBipolar;
        let mut ctl = SessionController::offline(mode);
        ctl.load_offline(offline_log(mode, 10_000, 0.01)).unwrap();
        assert_eq!(ctl.visible_range(), Some((0.0, 30.0)));
        assert_eq!(ctl.window().bounds(), Some((0, 5000)));

        let mut surface = RecordingSurface::default();
        ctl.render_to(&mut surface);
        assert_eq!(surface.visible, Some((0.0, 30.0)));
        assert_eq!(surface.series_len, Some(5001));
        let (xlo, xhi) = surface.x_limits.unwrap();
        assert_eq!(xlo, 0.0);
        assert!((xhi - 99.99).abs() < 1e-9);
    }

    #[test]
    fn short_load_shows_everything() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::offline(mode);
        ctl.load_offline(offline_log(mode, 50, 0.1)).unwrap();
        let (lo, hi) = ctl.visible_range().unwrap();
        assert_eq!(lo, 0.0);
        assert!((hi - 4.9).abs() < 1e-9);
    }

    #[test]
    fn load_validates_before_touching_state() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::offline(mode);
        ctl.load_offline(offline_log(mode, 10, 0.1)).unwrap();

        let mut bad_mode = offline_log(mode, 5, 0.1);
        bad_mode.mode = "Laplacian".into();
        assert!(matches!(
            ctl.load_offline(bad_mode),
            Err(ViewerError::UnknownMode(m)) if m == "Laplacian"
        ));
        let mut no_time = offline_log(mode, 5, 0.1);
        no_time.time.clear();
        assert!(matches!(
            ctl.load_offline(no_time),
            Err(ViewerError::MissingTimeData)
        ));
        let mut empty_column = offline_log(mode, 5, 0.1);
        empty_column.channels.insert("O1-O2".into(), Vec::new());
        assert!(matches!(
            ctl.load_offline(empty_column),
            Err(ViewerError::MissingTimeData)
        ));
        assert_eq!(ctl.buffer().len(), 10);
    }

    #[test]
    fn load_is_tolerant_of_odd_channel_sets() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut log = offline_log(mode, 20, 0.1);
        log.channels.insert("Cz".into(), vec![9.0; 20]);
        log.channels.remove("F7-F8");
        log.channels.get_mut("O1-O2").unwrap().truncate(15);
        log.markers.push(Marker::new("m1", 1.0, "Blink"));

        let mut ctl = SessionController::offline(AcquisitionMode::CommonReference);
        ctl.load_offline(log).unwrap();
        assert_eq!(ctl.mode(), mode);
        assert_eq!(ctl.buffer().len(), 15);
        assert!(ctl.buffer().channel("F7-F8").unwrap().iter().all(|v| v.is_nan()));
        assert!(ctl.buffer().channel("Cz").is_none());
        assert_eq!(ctl.markers().len(), 1);
    }

    #[test]
    fn save_load_save_is_stable() {
        let mode = AcquisitionMode::AverageReference;
        let mut ctl = SessionController::offline(mode);
        ctl.load_offline(offline_log(mode, 200, 0.004)).unwrap();
        ctl.add_marker(0.1).unwrap();
        ctl.add_marker(0.5).unwrap();

        let first = ctl.save_offline(1_700_000_100.0).unwrap();
        let last_time = *first.time.last().unwrap();
        assert!((first.anchor + last_time - 1_700_000_100.0).abs() < 1e-6);

        let mut reloaded = SessionController::offline(AcquisitionMode::CommonReference);
        reloaded.load_offline(first.clone()).unwrap();
        let second = reloaded.save_offline(1_700_000_100.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn save_requires_samples_and_no_stream() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::live(mode);
        assert!(matches!(ctl.save_offline(0.0), Err(ViewerError::EmptySession)));
        ctl.start_streaming();
        ctl.on_new_sample(batch(mode, [0.0, 0.1])).unwrap();
        assert!(matches!(ctl.save_offline(0.0), Err(ViewerError::StreamingActive)));
        ctl.stop_streaming();
        assert_eq!(ctl.save_offline(10.0).unwrap().time.len(), 2);
    }

    #[test]
    fn stopped_live_viewer_ignores_input() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::live(mode);
        ctl.on_new_sample(batch(mode, [0.0])).unwrap();
        assert!(ctl.on_new_marker(Marker::new("e", 0.0, "Event")).is_none());
        assert!(ctl.buffer().is_empty());
        assert!(ctl.markers().is_empty());
        assert!(!SessionController::offline(mode).start_streaming());
    }

    #[test]
    fn live_view_rides_the_newest_sample() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::live(mode);
        ctl.start_streaming();
        ctl.on_new_sample(batch(mode, (0..10).map(|i| i as f64 * 0.1))).unwrap();
        assert!(ctl.window().state().is_tailing());
        let (_, hi) = ctl.visible_range().unwrap();
        assert!((hi - 0.9).abs() < 1e-9);

        let mut surface = RecordingSurface::default();
        for chunk in 1..100 {
            let start = chunk * 10;
            ctl.on_new_sample(batch(mode, (start..start + 10).map(|i| i as f64 * 0.1)))
                .unwrap();
        }
        ctl.render_to(&mut surface);
        let (lo, hi) = surface.visible.unwrap();
        assert!((hi - 99.9).abs() < 1e-9);
        assert!((hi - lo - LIVE_MAX_VIEW).abs() < 1e-9);
        assert_eq!(ctl.window().bounds().map(|(_, hi)| hi), Some(999));
    }

    #[test]
    fn live_window_covers_the_whole_view() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::live(mode);
        ctl.start_streaming();
        // 250 Hz in 25-sample flushes, past the point where the view scrolls
        for flush in 0..80 {
            let start = flush * 25;
            ctl.on_new_sample(batch(mode, (start..start + 25).map(|i| i as f64 / 250.0)))
                .unwrap();
            let (vlo, vhi) = ctl.visible_range().unwrap();
            let first_visible = ctl.buffer().nearest(vlo).unwrap().index;
            let last_visible = ctl.buffer().nearest(vhi).unwrap().index;
            let slice = ctl.materialized_window().unwrap();
            assert!(slice.lo <= first_visible, "flush {flush}: {} > {first_visible}", slice.lo);
            assert!(slice.hi >= last_visible, "flush {flush}: {} < {last_visible}", slice.hi);
        }
        let (vlo, vhi) = ctl.visible_range().unwrap();
        assert!((vhi - vlo - LIVE_MAX_VIEW).abs() < 1e-9);
        assert!(ctl.materialized_window().unwrap().len() > 1250);
    }

    #[test]
    fn scrolled_back_live_view_stays_put() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::live(mode);
        ctl.start_streaming();
        ctl.on_new_sample(batch(mode, (0..100).map(|i| i as f64 * 0.1))).unwrap();
        ctl.on_visible_range_changed(1.0, 3.0);
        let bounds = ctl.window().bounds();
        ctl.on_new_sample(batch(mode, (100..110).map(|i| i as f64 * 0.1))).unwrap();
        assert_eq!(ctl.visible_range(), Some((1.0, 3.0)));
        assert_eq!(ctl.window().bounds(), bounds);
        assert!(!ctl.window().state().is_tailing());
    }

    #[test]
    fn mismatched_batch_is_rejected() {
        let mut ctl = SessionController::live(AcquisitionMode::TransverseBipolar);
        ctl.start_streaming();
        let err = ctl
            .on_new_sample(batch(AcquisitionMode::CommonReference, [0.0]))
            .unwrap_err();
        assert!(matches!(err, ViewerError::SchemaMismatch { .. }));
        assert!(ctl.buffer().is_empty());
    }

    #[test]
    fn click_markers_snap_and_stay_ordered() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::offline(mode);
        assert!(ctl.add_marker(1.0).is_none());
        ctl.load_offline(offline_log(mode, 100, 0.1)).unwrap();
        assert_eq!(ctl.add_marker(5.04), Some(0));
        assert_eq!(ctl.add_marker(2.0), Some(0));
        let m = ctl.markers().get(1).unwrap();
        assert!((m.time - 5.0).abs() < 1e-9);
        assert_eq!(m.label, "Event");
        assert_eq!(ctl.markers().get(1).unwrap().id, "marker_000001");
    }

    #[test]
    fn move_marker_snaps_without_reordering() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::offline(mode);
        ctl.load_offline(offline_log(mode, 100, 0.1)).unwrap();
        ctl.add_marker(1.0);
        ctl.add_marker(2.0);
        let moved = ctl.move_marker(0, 3.02).unwrap();
        assert!((moved - 3.0).abs() < 1e-9);
        assert!(ctl.markers().get(0).unwrap().time > ctl.markers().get(1).unwrap().time);
        assert!(ctl.move_marker(9, 1.0).is_none());
    }

    #[test]
    fn edit_and_remove_markers() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::offline(mode);
        ctl.load_offline(offline_log(mode, 100, 0.1)).unwrap();
        ctl.add_marker(1.0);
        let edit = MarkerEdit {
            label: Some("Blink".into()),
            ..Default::default()
        };
        assert!(ctl.edit_marker(0, edit).unwrap());
        assert_eq!(ctl.markers().get(0).unwrap().label, "Blink");
        assert!(!ctl.edit_marker(4, MarkerEdit::default()).unwrap());
        assert!(ctl.remove_marker(4).is_none());
        assert!(ctl.remove_marker(0).is_some());
        assert!(ctl.markers().is_empty());
    }

    #[test]
    fn navigation_keeps_view_width() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::offline(mode);
        ctl.load_offline(offline_log(mode, 1001, 0.1)).unwrap();
        ctl.on_visible_range_changed(40.0, 50.0);

        assert!(ctl.goto_end());
        let (lo, hi) = ctl.visible_range().unwrap();
        assert!((hi - 100.0).abs() < 1e-9 && (lo - 90.0).abs() < 1e-9);

        assert!(ctl.goto_start());
        assert_eq!(ctl.visible_range(), Some((0.0, 10.0)));

        ctl.load_offline({
            let mut log = offline_log(mode, 1001, 0.1);
            log.markers = vec![
                Marker::new("a", 50.0, "Event"),
                Marker::new("b", 99.0, "Event"),
            ];
            log
        })
        .unwrap();
        ctl.on_visible_range_changed(0.0, 10.0);
        assert!(ctl.focus_marker(0));
        assert_eq!(ctl.visible_range(), Some((45.0, 55.0)));
        assert!(ctl.focus_marker(1));
        let (lo, hi) = ctl.visible_range().unwrap();
        assert!((hi - 100.0).abs() < 1e-9 && (lo - 90.0).abs() < 1e-9);
        assert!(!ctl.focus_marker(2));
    }

    #[test]
    fn hover_readout_and_channel_visibility() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::offline(mode);
        ctl.load_offline(offline_log(mode, 100, 0.1)).unwrap();
        let (t, v) = ctl.value_at("F7-F8", 2.01).unwrap();
        assert!((t - 2.0).abs() < 1e-9);
        assert!((v - (2.0 * 1e-3 + 1e-4)).abs() < 1e-12);
        assert!(ctl.value_at("Cz", 2.0).is_none());

        let mut surface = RecordingSurface::default();
        assert!(ctl.set_channel_visible("T3-T4", false));
        assert!(!ctl.set_channel_visible("Cz", false));
        ctl.render_to(&mut surface);
        assert_eq!(surface.shown_channels, vec!["Fp1-Fp2", "F7-F8", "T5-T6", "O1-O2"]);
        assert!(!ctl.is_channel_visible("T3-T4"));
    }

    #[test]
    fn marker_lines_cover_only_the_materialized_range() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::with_policy(
            ViewerKind::Offline,
            mode,
            WindowPolicy {
                cache_margin: 10,
                refetch_threshold: 5,
                ..WindowPolicy::offline()
            },
        );
        let mut log = offline_log(mode, 1000, 0.1);
        log.markers = vec![
            Marker::new("a", 1.0, "Event"),
            Marker::new("b", 50.0, "Event"),
            Marker::new("c", 90.0, "Event"),
        ];
        ctl.load_offline(log).unwrap();
        ctl.on_visible_range_changed(45.0, 55.0);
        let lines = ctl.marker_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].id, "b");
        assert_eq!(lines[0].index, 1);
        assert!((lines[0].bounds.0 - 1.001).abs() < 1e-9);
        assert!((lines[0].bounds.1 - 89.999).abs() < 1e-9);
    }

    #[test]
    fn render_drains_pending_updates() {
        let mode = AcquisitionMode::TransverseBipolar;
        let mut ctl = SessionController::offline(mode);
        ctl.load_offline(offline_log(mode, 100, 0.1)).unwrap();
        let mut surface = RecordingSurface::default();
        ctl.render_to(&mut surface);
        assert_eq!(surface.series_updates, 1);
        ctl.render_to(&mut surface);
        assert_eq!(surface.series_updates, 1);
        assert_eq!(surface.rebuilt.len(), 1);
    }
}
