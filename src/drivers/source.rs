#[cfg(test)]
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::drivers::mode::AcquisitionMode;
use crate::drivers::ViewerError;

/// One reading in the shape the headset publishes for each mode.
/// Values follow the order of [`AcquisitionMode::channel_names`].
#[derive(Clone, Debug, PartialEq)]
pub enum ModeReading {
    CommonReference([f64; 10]),
    AverageReference([f64; 10]),
    LongitudinalBipolar([f64; 8]),
    TransverseBipolar([f64; 5]),
}

impl ModeReading {
    pub fn mode(&self) -> AcquisitionMode {
        match self {
            ModeReading::CommonReference(_) => AcquisitionMode::CommonReference,
            ModeReading::AverageReference(_) => AcquisitionMode::AverageReference,
            ModeReading::LongitudinalBipolar(_) => AcquisitionMode::LongitudinalBipolar,
            ModeReading::TransverseBipolar(_) => AcquisitionMode::TransverseBipolar,
        }
    }

    pub fn values(&self) -> &[f64] {
        match self {
            ModeReading::CommonReference(v) | ModeReading::AverageReference(v) => v.as_slice(),
            ModeReading::LongitudinalBipolar(v) => v.as_slice(),
            ModeReading::TransverseBipolar(v) => v.as_slice(),
        }
    }

    /// Builds the reading for `mode` from ordered values.
    pub fn from_values(mode: AcquisitionMode, values: &[f64]) -> Result<Self, ViewerError> {
        let wrong_len = || {
            ViewerError::schema(
                mode,
                format!("expected {} values, got {}", mode.channel_count(), values.len()),
            )
        };
        Ok(match mode {
            AcquisitionMode::CommonReference => {
                ModeReading::CommonReference(values.try_into().map_err(|_| wrong_len())?)
            }
            AcquisitionMode::AverageReference => {
                ModeReading::AverageReference(values.try_into().map_err(|_| wrong_len())?)
            }
            AcquisitionMode::LongitudinalBipolar => {
                ModeReading::LongitudinalBipolar(values.try_into().map_err(|_| wrong_len())?)
            }
            AcquisitionMode::TransverseBipolar => {
                ModeReading::TransverseBipolar(values.try_into().map_err(|_| wrong_len())?)
            }
        })
    }
}

/// Seconds since the Unix epoch, the clock message stamps are given in.
pub fn wallclock() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Message delivered by a device subscription. `stamp` is wallclock seconds.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundMessage {
    Reading {
        stamp: f64,
        reading: ModeReading,
    },
    Event {
        stamp: f64,
        id: String,
        status: String,
        remark: String,
    },
}

/// Something that yields device messages on demand.
///
/// `Ok(None)` means nothing is available right now; the caller polls again.
pub trait SignalSource: Send {
    fn next_message(&mut self) -> Result<Option<InboundMessage>, ViewerError>;

    /// `true` once the source will never yield again.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// In-memory source for deterministic playback in tests.
#[cfg(test)]
pub struct ManualSource {
    queue: VecDeque<InboundMessage>,
}

#[cfg(test)]
impl ManualSource {
    pub fn new(messages: impl IntoIterator<Item = InboundMessage>) -> Self {
        Self {
            queue: messages.into_iter().collect(),
        }
    }
}

#[cfg(test)]
impl SignalSource for ManualSource {
    fn next_message(&mut self) -> Result<Option<InboundMessage>, ViewerError> {
        Ok(self.queue.pop_front())
    }

    fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_shape_matches_mode_table() {
        for mode in AcquisitionMode::ALL {
            let values = vec![1.0; mode.channel_count()];
            let reading = ModeReading::from_values(mode, &values).unwrap();
            assert_eq!(reading.mode(), mode);
            assert_eq!(reading.values().len(), mode.channel_count());
        }
        assert!(ModeReading::from_values(AcquisitionMode::TransverseBipolar, &[0.0; 8]).is_err());
    }

    #[test]
    fn manual_source_drains_in_order() {
        let mut src = ManualSource::new(vec![
            InboundMessage::Reading {
                stamp: 1.0,
                reading: ModeReading::TransverseBipolar([0.0; 5]),
            },
            InboundMessage::Event {
                stamp: 2.0,
                id: "e1".into(),
                status: "start".into(),
                remark: String::new(),
            },
        ]);
        assert!(matches!(
            src.next_message().unwrap(),
            Some(InboundMessage::Reading { stamp, .. }) if stamp == 1.0
        ));
        assert!(!src.is_exhausted());
        assert!(matches!(
            src.next_message().unwrap(),
            Some(InboundMessage::Event { id, .. }) if id == "e1"
        ));
        assert!(src.is_exhausted());
        assert!(src.next_message().unwrap().is_none());
    }
}
