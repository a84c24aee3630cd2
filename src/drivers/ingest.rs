use crate::drivers::buffer::SampleBatch;
use crate::drivers::markers::Marker;
use crate::drivers::source::InboundMessage;

/// Seconds of stream time between two UI refreshes.
pub const FLUSH_INTERVAL: f64 = 0.1;

/// What the UI thread has to apply after a message was accepted.
#[derive(Clone, Debug, PartialEq)]
pub enum IngestOutput {
    Samples(SampleBatch),
    Marker(Marker),
}

/// Turns device messages into session-relative batches and markers.
///
/// Owned by the stream worker: both the message path and the flush path run
/// on that one thread, so the pending batch needs no lock.
#[derive(Debug)]
pub struct StreamIngest {
    t0: Option<f64>,
    last_flush: Option<f64>,
    pending: Option<SampleBatch>,
    flush_interval: f64,
}

impl Default for StreamIngest {
    fn default() -> Self {
        Self::new(FLUSH_INTERVAL)
    }
}

impl StreamIngest {
    pub fn new(flush_interval: f64) -> Self {
        Self {
            t0: None,
            last_flush: None,
            pending: None,
            flush_interval,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.as_ref().map_or(0, SampleBatch::len)
    }

    pub fn accept(&mut self, msg: InboundMessage) -> Option<IngestOutput> {
        match msg {
            InboundMessage::Reading { stamp, reading } => {
                let t0 = *self.t0.get_or_insert(stamp);
                let last_flush = *self.last_flush.get_or_insert(stamp);
                let mode = reading.mode();
                if let Some(batch) = &self.pending {
                    if batch.mode != mode {
                        log::warn!(
                            "stream switched from {} to {mode}, dropping {} pending samples",
                            batch.mode,
                            batch.len()
                        );
                        self.pending = None;
                    }
                }
                let batch = self.pending.get_or_insert_with(|| SampleBatch::new(mode));
                if let Err(err) = batch.push(stamp - t0, reading.values()) {
                    log::warn!("dropping reading: {err}");
                    return None;
                }
                if stamp - last_flush > self.flush_interval {
                    self.last_flush = Some(stamp);
                    return self.flush().map(IngestOutput::Samples);
                }
                None
            }
            InboundMessage::Event {
                stamp,
                id,
                status,
                remark,
            } => match self.t0 {
                Some(t0) => Some(IngestOutput::Marker(
                    Marker::new(id, stamp - t0, status).with_remark(remark),
                )),
                None => {
                    log::warn!("dropping event {id}: no reading received yet");
                    None
                }
            },
        }
    }

    /// Hands over whatever is pending, if anything.
    pub fn flush(&mut self) -> Option<SampleBatch> {
        match self.pending.take() {
            Some(batch) if !batch.is_empty() => Some(batch),
            _ => None,
        }
    }

    /// Idle-timer flush: releases the pending batch once `now` is past the
    /// flush interval, even if no further reading arrived.
    pub fn poll(&mut self, now: f64) -> Option<SampleBatch> {
        let last_flush = self.last_flush?;
        if self.pending_len() > 0 && now - last_flush > self.flush_interval {
            self.last_flush = Some(now);
            return self.flush();
        }
        None
    }

    /// Marker raised from the UI while streaming, stamped with `now`.
    pub fn ui_marker(
        &self,
        id: impl Into<String>,
        label: impl Into<String>,
        remark: impl Into<String>,
        now: f64,
    ) -> Option<Marker> {
        let t0 = self.t0?;
        Some(Marker::new(id, now - t0, label).with_remark(remark))
    }
}
