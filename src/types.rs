// src/types.rs
use std::fmt;
use std::path::PathBuf;

use crate::drivers::{
    ConnectionStatus, DeviceEntry, FilterParams, Marker, SampleBatch, SessionLog, ViewerError,
};

/// Background operations; at most one of each kind runs at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Scan,
    Connect,
    Disconnect,
    FilterGet,
    FilterSet,
    LicenceGet,
    LicenceSet,
    Load,
    Save,
}

impl OperationKind {
    pub fn label(self) -> &'static str {
        match self {
            OperationKind::Scan => "scan",
            OperationKind::Connect => "connect",
            OperationKind::Disconnect => "disconnect",
            OperationKind::FilterGet => "filter read",
            OperationKind::FilterSet => "filter update",
            OperationKind::LicenceGet => "licence read",
            OperationKind::LicenceSet => "licence update",
            OperationKind::Load => "load",
            OperationKind::Save => "save",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// UI -> task runner
#[derive(Clone, Debug)]
pub enum Task {
    Scan,
    Connect(String),
    Disconnect,
    GetFilter,
    SetFilter(FilterParams),
    GetLicence,
    SetLicence(Vec<String>),
    Load(PathBuf),
    Save(PathBuf, SessionLog),
}

impl Task {
    pub fn kind(&self) -> OperationKind {
        match self {
            Task::Scan => OperationKind::Scan,
            Task::Connect(_) => OperationKind::Connect,
            Task::Disconnect => OperationKind::Disconnect,
            Task::GetFilter => OperationKind::FilterGet,
            Task::SetFilter(_) => OperationKind::FilterSet,
            Task::GetLicence => OperationKind::LicenceGet,
            Task::SetLicence(_) => OperationKind::LicenceSet,
            Task::Load(_) => OperationKind::Load,
            Task::Save(..) => OperationKind::Save,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TaskOutcome {
    Scanned(Vec<DeviceEntry>),
    Connected { name: String, ok: bool },
    Disconnected,
    Filter(FilterParams),
    FilterSet,
    Licence(Vec<String>),
    LicenceSet,
    Loaded { path: PathBuf, log: SessionLog },
    Saved(PathBuf),
}

// UI -> stream worker
#[derive(Clone, Debug)]
pub enum StreamCommand {
    /// Marker raised from the UI, stamped by the worker's clock.
    Marker {
        id: String,
        label: String,
        remark: String,
    },
    Stop,
}

// background -> UI
#[derive(Debug)]
pub enum ViewerEvent {
    Log(String),
    Task {
        kind: OperationKind,
        result: Result<TaskOutcome, ViewerError>,
    },
    Samples(SampleBatch),
    Marker(Marker),
    Connection(ConnectionStatus),
    StreamEnded,
}
