use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::drivers::ViewerError;

/// Minimum gap kept between a dragged marker and its list neighbours.
pub const DRAG_EPSILON: f64 = 0.001;

const FIRST_MARKER_ID: &str = "marker_000001";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub time: f64,
    pub label: String,
    pub remark: String,
}

impl Marker {
    pub fn new(id: impl Into<String>, time: f64, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            time,
            label: label.into(),
            remark: String::new(),
        }
    }

    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }
}

/// Field replacements applied by [`MarkerLog::edit`]; `None` keeps the field.
#[derive(Clone, Debug, Default)]
pub struct MarkerEdit {
    pub id: Option<String>,
    pub time: Option<f64>,
    pub label: Option<String>,
    pub remark: Option<String>,
}

/// Annotations of one session, kept in ascending time order by insertion.
#[derive(Clone, Debug, Default)]
pub struct MarkerLog {
    markers: Vec<Marker>,
}

impl MarkerLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts a stored list as-is, without re-sorting.
    pub fn from_markers(markers: Vec<Marker>) -> Self {
        Self { markers }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn as_slice(&self) -> &[Marker] {
        &self.markers
    }

    pub fn ids(&self) -> HashSet<&str> {
        self.markers.iter().map(|m| m.id.as_str()).collect()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.markers.iter().any(|m| m.id == id)
    }

    /// Inserts before the first marker whose time is not less than `marker.time`.
    ///
    /// A colliding id is replaced by a fresh one. Returns the insert position.
    pub fn insert_ordered(&mut self, mut marker: Marker) -> usize {
        self.ensure_unique_id(&mut marker);
        let pos = self
            .markers
            .iter()
            .position(|m| !(m.time < marker.time))
            .unwrap_or(self.markers.len());
        self.markers.insert(pos, marker);
        pos
    }

    /// Appends at the end; used for streamed events, which arrive in time order.
    pub fn push(&mut self, mut marker: Marker) -> usize {
        self.ensure_unique_id(&mut marker);
        self.markers.push(marker);
        self.markers.len() - 1
    }

    /// Replaces fields in place. The list is not re-sorted, so moving a
    /// marker's time past a neighbour leaves the list out of time order.
    ///
    /// Out-of-range indices are a no-op and return `Ok(false)`.
    pub fn edit(&mut self, index: usize, edit: MarkerEdit) -> Result<bool, ViewerError> {
        if index >= self.markers.len() {
            return Ok(false);
        }
        if let Some(id) = &edit.id {
            let taken = self
                .markers
                .iter()
                .enumerate()
                .any(|(i, m)| i != index && &m.id == id);
            if taken {
                return Err(ViewerError::DuplicateMarkerId(id.clone()));
            }
        }
        let marker = &mut self.markers[index];
        if let Some(id) = edit.id {
            marker.id = id;
        }
        if let Some(time) = edit.time {
            marker.time = time;
        }
        if let Some(label) = edit.label {
            marker.label = label;
        }
        if let Some(remark) = edit.remark {
            marker.remark = remark;
        }
        Ok(true)
    }

    /// Removes by position; out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<Marker> {
        if index < self.markers.len() {
            Some(self.markers.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Fresh id of the form `marker_NNNNNN`, unique within this log.
    pub fn generate_unique_id(&self) -> String {
        let taken = self.ids();
        let mut rng = rand::thread_rng();
        let mut id = FIRST_MARKER_ID.to_owned();
        while taken.contains(id.as_str()) {
            id = format!("marker_{:06}", rng.gen_range(0..=999_999));
        }
        id
    }

    /// Range a marker may be dragged within, from its list neighbours.
    ///
    /// Neighbours are taken by list position, so after an out-of-order
    /// edit the bounds reflect stale neighbours.
    pub fn drag_bounds(&self, index: usize, data_start: f64, data_end: f64) -> Option<(f64, f64)> {
        if index >= self.markers.len() {
            return None;
        }
        let lo = match index.checked_sub(1) {
            Some(prev) => self.markers[prev].time + DRAG_EPSILON,
            None => data_start,
        };
        let hi = match self.markers.get(index + 1) {
            Some(next) => next.time - DRAG_EPSILON,
            None => data_end,
        };
        Some((lo, hi))
    }

    /// Markers whose time lies in `[lo, hi]`, with their list positions.
    pub fn in_range(&self, lo: f64, hi: f64) -> impl Iterator<Item = (usize, &Marker)> {
        self.markers
            .iter()
            .enumerate()
            .filter(move |(_, m)| m.time >= lo && m.time <= hi)
    }

    fn ensure_unique_id(&self, marker: &mut Marker) {
        if self.contains_id(&marker.id) {
            let fresh = self.generate_unique_id();
            log::debug!("marker id {} already used, renamed to {}", marker.id, fresh);
            marker.id = fresh;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_with(times: &[f64]) -> MarkerLog {
        let mut log = MarkerLog::new();
        for (i, &t) in times.iter().enumerate() {
            log.insert_ordered(Marker::new(format!("m{i}"), t, "Event"));
        }
        log
    }

    #[test]
    fn insert_between_keeps_ascending_order() {
        let mut log = log_with(&[1.0, 3.0, 5.0]);
        let pos = log.insert_ordered(Marker::new("mid", 4.0, "Event"));
        assert_eq!(pos, 2);
        let times: Vec<f64> = log.iter().map(|m| m.time).collect();
        assert_eq!(times, vec![1.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn insert_at_equal_time_goes_first() {
        let mut log = log_with(&[1.0, 3.0]);
        assert_eq!(log.insert_ordered(Marker::new("same", 3.0, "Event")), 1);
        assert_eq!(log.insert_ordered(Marker::new("late", 9.0, "Event")), 3);
        assert_eq!(log.insert_ordered(Marker::new("early", 0.0, "Event")), 0);
    }

    #[test]
    fn duplicate_id_is_regenerated_not_overwritten() {
        let mut log = log_with(&[1.0]);
        log.insert_ordered(Marker::new("m0", 2.0, "Other"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.get(0).unwrap().label, "Event");
        let renamed = &log.get(1).unwrap().id;
        assert_ne!(renamed, "m0");
        assert!(renamed.starts_with("marker_"));
        assert_eq!(renamed.len(), "marker_000000".len());

        log.push(Marker::new("m0", 3.0, "Streamed"));
        assert_eq!(log.ids().len(), 3);
    }

    #[test]
    fn generated_ids_start_at_first_and_avoid_collisions() {
        let mut log = MarkerLog::new();
        assert_eq!(log.generate_unique_id(), "marker_000001");
        log.push(Marker::new("marker_000001", 0.0, "Event"));
        for _ in 0..50 {
            let id = log.generate_unique_id();
            assert!(!log.contains_id(&id));
            log.push(Marker::new(id, 0.0, "Event"));
        }
        assert_eq!(log.ids().len(), 51);
    }

    #[test]
    fn edit_does_not_reorder() {
        let mut log = log_with(&[1.0, 2.0, 3.0]);
        let edit = MarkerEdit {
            time: Some(10.0),
            label: Some("Moved".into()),
            ..Default::default()
        };
        assert!(log.edit(0, edit).unwrap());
        let times: Vec<f64> = log.iter().map(|m| m.time).collect();
        assert_eq!(times, vec![10.0, 2.0, 3.0]);
        assert_eq!(log.get(0).unwrap().label, "Moved");
        assert_eq!(log.get(0).unwrap().id, "m0");
        // neighbours come from list order, not time order
        assert_eq!(log.drag_bounds(1, 0.0, 20.0), Some((10.0 + DRAG_EPSILON, 3.0 - DRAG_EPSILON)));
    }

    #[test]
    fn edit_out_of_range_and_duplicate_id() {
        let mut log = log_with(&[1.0, 2.0]);
        assert!(!log.edit(7, MarkerEdit::default()).unwrap());
        let clash = MarkerEdit {
            id: Some("m1".into()),
            ..Default::default()
        };
        assert!(matches!(log.edit(0, clash), Err(ViewerError::DuplicateMarkerId(_))));
        let keep = MarkerEdit {
            id: Some("m0".into()),
            remark: Some("note".into()),
            ..Default::default()
        };
        assert!(log.edit(0, keep).unwrap());
        assert_eq!(log.get(0).unwrap().remark, "note");
    }

    #[test]
    fn remove_out_of_range_is_benign() {
        let mut log = log_with(&[1.0, 2.0]);
        assert!(log.remove(5).is_none());
        assert_eq!(log.remove(0).unwrap().id, "m0");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn drag_bounds_at_the_edges_use_data_range() {
        let log = log_with(&[1.0, 2.0]);
        assert_eq!(log.drag_bounds(0, 0.0, 9.0), Some((0.0, 2.0 - DRAG_EPSILON)));
        assert_eq!(log.drag_bounds(1, 0.0, 9.0), Some((1.0 + DRAG_EPSILON, 9.0)));
        assert_eq!(log.drag_bounds(2, 0.0, 9.0), None);
    }

    #[test]
    fn in_range_filters_by_time() {
        let log = log_with(&[1.0, 2.0, 3.0, 4.0]);
        let hits: Vec<usize> = log.in_range(1.5, 3.0).map(|(i, _)| i).collect();
        assert_eq!(hits, vec![1, 2]);
    }
}
