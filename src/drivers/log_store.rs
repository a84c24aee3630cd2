use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::drivers::markers::Marker;
use crate::drivers::ViewerError;

/// Persisted form of one recorded session.
///
/// `time` holds session-relative offsets; `anchor` is the wallclock second
/// the offsets are counted from, so `anchor + time[i]` is the absolute stamp.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub mode: String,
    #[serde(default)]
    pub anchor: f64,
    #[serde(default)]
    pub time: Vec<f64>,
    #[serde(default)]
    pub channels: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub markers: Vec<Marker>,
}

/// Reads and writes session logs in some on-disk encoding.
pub trait LogStore: Send + Sync {
    fn read_log(&self, path: &Path) -> Result<SessionLog, ViewerError>;
    fn write_log(&self, path: &Path, log: &SessionLog) -> Result<(), ViewerError>;
}

/// Pretty-printed JSON, one document per file.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonLogStore;

impl LogStore for JsonLogStore {
    fn read_log(&self, path: &Path) -> Result<SessionLog, ViewerError> {
        let reader = BufReader::new(File::open(path)?);
        let log: SessionLog = serde_json::from_reader(reader)?;
        log::info!(
            "read {} samples and {} markers from {}",
            log.time.len(),
            log.markers.len(),
            path.display()
        );
        Ok(log)
    }

    fn write_log(&self, path: &Path, log: &SessionLog) -> Result<(), ViewerError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, log)?;
        writer.flush()?;
        log::info!("wrote {} samples to {}", log.time.len(), path.display());
        Ok(())
    }
}
