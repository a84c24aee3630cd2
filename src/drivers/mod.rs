// src/drivers/mod.rs
pub mod buffer;
pub mod device;
pub mod error;
pub mod ingest;
pub mod log_store;
pub mod markers;
pub mod mode;
pub mod session;
pub mod source;
pub mod time_index;
pub mod window;

pub use buffer::{ChannelSlice, SampleBatch};
pub use device::{ConnectionStatus, DeviceEntry, DeviceService, FilterParams, SimulatedDevice};
pub use error::ViewerError;
pub use ingest::{IngestOutput, StreamIngest};
pub use log_store::{JsonLogStore, LogStore, SessionLog};
pub use markers::{Marker, MarkerEdit};
pub use mode::AcquisitionMode;
pub use session::{MarkerLine, PlotSurface, SessionController, ViewerKind};
pub use source::SignalSource;
