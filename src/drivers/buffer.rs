use crate::drivers::mode::AcquisitionMode;
use crate::drivers::time_index::{self, NearestSample};
use crate::drivers::ViewerError;

/// Samples accumulated by the ingest path between two flushes.
///
/// Values are stored channel-major in the order of `mode.channel_names()`.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBatch {
    pub mode: AcquisitionMode,
    pub time: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

impl SampleBatch {
    pub fn new(mode: AcquisitionMode) -> Self {
        Self {
            mode,
            time: Vec::new(),
            values: vec![Vec::new(); mode.channel_count()],
        }
    }

    pub fn push(&mut self, time: f64, values: &[f64]) -> Result<(), ViewerError> {
        if values.len() != self.values.len() {
            return Err(ViewerError::schema(
                self.mode,
                format!("expected {} values, got {}", self.values.len(), values.len()),
            ));
        }
        self.time.push(time);
        for (column, &v) in self.values.iter_mut().zip(values) {
            column.push(v);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn validate(&self) -> Result<(), ViewerError> {
        if self.values.len() != self.mode.channel_count() {
            return Err(ViewerError::schema(
                self.mode,
                format!(
                    "expected {} channels, got {}",
                    self.mode.channel_count(),
                    self.values.len()
                ),
            ));
        }
        if let Some((idx, column)) = self
            .values
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != self.time.len())
        {
            return Err(ViewerError::schema(
                self.mode,
                format!(
                    "channel {} has {} values for {} timestamps",
                    self.mode.channel_names()[idx],
                    column.len(),
                    self.time.len()
                ),
            ));
        }
        Ok(())
    }
}

/// Read-only view of `[lo, hi]` (inclusive) of a [`ChannelBuffer`].
#[derive(Clone, Debug)]
pub struct ChannelSlice<'a> {
    pub mode: AcquisitionMode,
    pub lo: usize,
    pub hi: usize,
    pub time: &'a [f64],
    values: Vec<&'a [f64]>,
}

impl<'a> ChannelSlice<'a> {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn channel(&self, name: &str) -> Option<&'a [f64]> {
        self.mode.channel_index(name).map(|idx| self.values[idx])
    }

    pub fn channels(&self) -> impl Iterator<Item = (&'static str, &'a [f64])> + '_ {
        self.mode
            .channel_names()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

/// Append-only, time-aligned sample storage for one acquisition mode.
///
/// All channel columns share the time axis and always have its length.
/// Growth is unbounded; data goes away only through [`ChannelBuffer::clear`].
/// Callers supply non-decreasing times, nearest-time lookups rely on it.
#[derive(Clone, Debug)]
pub struct ChannelBuffer {
    mode: AcquisitionMode,
    time: Vec<f64>,
    per_channel: Vec<Vec<f64>>, // channel -> samples
}

impl ChannelBuffer {
    pub fn new(mode: AcquisitionMode) -> Self {
        Self {
            mode,
            time: Vec::new(),
            per_channel: vec![Vec::new(); mode.channel_count()],
        }
    }

    /// Builds a buffer from whole columns, as read from a session log.
    pub fn from_columns(
        mode: AcquisitionMode,
        time: Vec<f64>,
        per_channel: Vec<Vec<f64>>,
    ) -> Result<Self, ViewerError> {
        let batch = SampleBatch {
            mode,
            time,
            values: per_channel,
        };
        batch.validate()?;
        Ok(Self {
            mode,
            time: batch.time,
            per_channel: batch.values,
        })
    }

    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.time
    }

    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.mode
            .channel_index(name)
            .map(|idx| self.per_channel[idx].as_slice())
    }

    pub fn first_time(&self) -> Option<f64> {
        self.time.first().copied()
    }

    pub fn last_time(&self) -> Option<f64> {
        self.time.last().copied()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.time.len().checked_sub(1)
    }

    pub fn nearest(&self, t: f64) -> Option<NearestSample> {
        time_index::nearest(&self.time, t)
    }

    /// Appends one sample given as `(channel name, value)` pairs.
    ///
    /// The names must be exactly the active mode's channel set.
    pub fn append<S, I>(&mut self, time: f64, values: I) -> Result<(), ViewerError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, f64)>,
    {
        let mut row: Vec<Option<f64>> = vec![None; self.per_channel.len()];
        for (name, value) in values {
            let name = name.as_ref();
            let idx = self
                .mode
                .channel_index(name)
                .ok_or_else(|| ViewerError::schema(self.mode, format!("unknown channel {name}")))?;
            if row[idx].replace(value).is_some() {
                return Err(ViewerError::schema(
                    self.mode,
                    format!("channel {name} given twice"),
                ));
            }
        }
        if let Some(missing) = row.iter().position(Option::is_none) {
            return Err(ViewerError::schema(
                self.mode,
                format!("missing channel {}", self.mode.channel_names()[missing]),
            ));
        }
        self.time.push(time);
        for (column, value) in self.per_channel.iter_mut().zip(row.into_iter().flatten()) {
            column.push(value);
        }
        Ok(())
    }

    /// Appends a flushed batch as one unit; a malformed batch changes nothing.
    pub fn append_batch(&mut self, batch: &SampleBatch) -> Result<(), ViewerError> {
        if batch.mode != self.mode {
            return Err(ViewerError::schema(
                self.mode,
                format!("batch recorded in {}", batch.mode),
            ));
        }
        batch.validate()?;
        self.time.extend_from_slice(&batch.time);
        for (column, new_samples) in self.per_channel.iter_mut().zip(&batch.values) {
            column.extend_from_slice(new_samples);
        }
        Ok(())
    }

    /// Borrowed view of `[lo, hi]`; `None` for an inverted or out-of-range request.
    pub fn slice(&self, lo: usize, hi: usize) -> Option<ChannelSlice<'_>> {
        if lo > hi || hi >= self.time.len() {
            return None;
        }
        Some(ChannelSlice {
            mode: self.mode,
            lo,
            hi,
            time: &self.time[lo..=hi],
            values: self.per_channel.iter().map(|c| &c[lo..=hi]).collect(),
        })
    }

    pub fn clear(&mut self) {
        self.time.clear();
        for column in &mut self.per_channel {
            column.clear();
        }
    }

    /// Drops everything and switches to another channel layout.
    pub fn reset(&mut self, mode: AcquisitionMode) {
        *self = Self::new(mode);
    }
}
