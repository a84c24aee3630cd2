use thiserror::Error;

use crate::drivers::mode::AcquisitionMode;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("channel set does not match {mode} ({detail})")]
    SchemaMismatch {
        mode: AcquisitionMode,
        detail: String,
    },
    #[error("unknown acquisition mode `{0}`")]
    UnknownMode(String),
    #[error("session log has no time data")]
    MissingTimeData,
    #[error("session holds no samples to save")]
    EmptySession,
    #[error("stop recording before saving")]
    StreamingActive,
    #[error("marker id `{0}` is already used")]
    DuplicateMarkerId(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("a {0} request is already in flight")]
    Busy(&'static str),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed session log: {0}")]
    Format(#[from] serde_json::Error),
}

impl ViewerError {
    pub fn schema(mode: AcquisitionMode, detail: impl Into<String>) -> Self {
        ViewerError::SchemaMismatch {
            mode,
            detail: detail.into(),
        }
    }
}
