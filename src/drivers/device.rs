use std::f64::consts::TAU;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::drivers::mode::AcquisitionMode;
use crate::drivers::source::{wallclock, InboundMessage, ModeReading, SignalSource};
use crate::drivers::ViewerError;

/// Entry of a device scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceEntry {
    pub name: String,
    pub valid: bool,
}

/// Link state reported by the headset node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnecting,
    #[default]
    Disconnected,
}

impl ConnectionStatus {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnecting => "Disconnecting",
            ConnectionStatus::Disconnected => "Disconnected",
        }
    }
}

/// On-device filter settings, in Hz.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub lowpass: f64,
    pub highpass: f64,
    pub notch_low: f64,
    pub notch_high: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            lowpass: 100.0,
            highpass: 1.0,
            notch_low: 48.0,
            notch_high: 52.0,
        }
    }
}

/// Request/response surface of the headset node.
///
/// Calls may block; they are issued from task threads, never the UI thread.
pub trait DeviceService: Send + Sync {
    fn scan(&self) -> Result<Vec<DeviceEntry>, ViewerError>;
    fn connect(&self, name: &str) -> Result<bool, ViewerError>;
    fn disconnect(&self) -> Result<(), ViewerError>;
    fn filter_params(&self) -> Result<FilterParams, ViewerError>;
    fn set_filter_params(&self, params: FilterParams) -> Result<(), ViewerError>;
    fn licence_keys(&self) -> Result<Vec<String>, ViewerError>;
    fn set_licence_keys(&self, keys: Vec<String>) -> Result<(), ViewerError>;
    /// Opens the data stream of one acquisition mode.
    fn subscribe(&self, mode: AcquisitionMode) -> Result<Box<dyn SignalSource>, ViewerError>;
}

#[derive(Debug, Default)]
struct SimState {
    connected: Option<String>,
    filter: FilterParams,
    licence: Vec<String>,
}

/// Headset stand-in that produces synthetic sine-plus-noise readings.
#[derive(Debug)]
pub struct SimulatedDevice {
    devices: Vec<String>,
    sample_rate: f64,
    state: Mutex<SimState>,
}

impl SimulatedDevice {
    pub fn new(devices: Vec<String>, sample_rate: f64) -> Self {
        Self {
            devices,
            sample_rate,
            state: Mutex::new(SimState::default()),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SimState) -> T) -> Result<T, ViewerError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ViewerError::DeviceUnavailable("simulator state poisoned".into()))?;
        Ok(f(&mut state))
    }

    pub fn connected_device(&self) -> Option<String> {
        self.with_state(|s| s.connected.clone()).ok().flatten()
    }
}

impl DeviceService for SimulatedDevice {
    fn scan(&self) -> Result<Vec<DeviceEntry>, ViewerError> {
        Ok(self
            .devices
            .iter()
            .map(|name| DeviceEntry {
                name: name.clone(),
                valid: true,
            })
            .collect())
    }

    fn connect(&self, name: &str) -> Result<bool, ViewerError> {
        if !self.devices.iter().any(|d| d == name) {
            return Ok(false);
        }
        self.with_state(|s| s.connected = Some(name.to_owned()))?;
        log::info!("simulated device {name} connected");
        Ok(true)
    }

    fn disconnect(&self) -> Result<(), ViewerError> {
        self.with_state(|s| s.connected = None)
    }

    fn filter_params(&self) -> Result<FilterParams, ViewerError> {
        self.with_state(|s| s.filter)
    }

    fn set_filter_params(&self, params: FilterParams) -> Result<(), ViewerError> {
        self.with_state(|s| s.filter = params)
    }

    fn licence_keys(&self) -> Result<Vec<String>, ViewerError> {
        self.with_state(|s| s.licence.clone())
    }

    fn set_licence_keys(&self, keys: Vec<String>) -> Result<(), ViewerError> {
        self.with_state(|s| s.licence = keys)
    }

    fn subscribe(&self, mode: AcquisitionMode) -> Result<Box<dyn SignalSource>, ViewerError> {
        if self.connected_device().is_none() {
            return Err(ViewerError::DeviceUnavailable("no device connected".into()));
        }
        Ok(Box::new(SimulatedSource::new(mode, self.sample_rate, wallclock())))
    }
}

/// Emits one reading per sample period of wallclock time, and a
/// "Stimulus" event every [`SimulatedSource::STIMULUS_PERIOD`] seconds.
pub struct SimulatedSource {
    mode: AcquisitionMode,
    sample_rate: f64,
    start: f64,
    emitted: u64,
    stimuli: u64,
    rng: StdRng,
}

impl SimulatedSource {
    const AMPLITUDE: f64 = 0.05;
    const NOISE: f64 = 0.01;
    pub const STIMULUS_PERIOD: f64 = 2.0;

    pub fn new(mode: AcquisitionMode, sample_rate: f64, start: f64) -> Self {
        Self {
            mode,
            sample_rate: sample_rate.max(1.0),
            start,
            emitted: 0,
            stimuli: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Next message whose stamp is not later than `now`. A stimulus due at
    /// the same stamp as a reading comes first.
    pub fn next_due(&mut self, now: f64) -> Option<InboundMessage> {
        let stamp = self.start + self.emitted as f64 / self.sample_rate;
        let stimulus = self.start + (self.stimuli + 1) as f64 * Self::STIMULUS_PERIOD;
        if stimulus <= stamp && stimulus <= now {
            self.stimuli += 1;
            return Some(InboundMessage::Event {
                stamp: stimulus,
                id: format!("stim_{:04}", self.stimuli),
                status: "Stimulus".to_owned(),
                remark: String::new(),
            });
        }
        if stamp > now {
            return None;
        }
        self.emitted += 1;
        let values: Vec<f64> = (0..self.mode.channel_count())
            .map(|ch| {
                let freq = 6.0 + 2.0 * ch as f64;
                Self::AMPLITUDE * (TAU * freq * (stamp - self.start)).sin()
                    + self.rng.gen_range(-Self::NOISE..Self::NOISE)
            })
            .collect();
        let reading = ModeReading::from_values(self.mode, &values).ok()?;
        Some(InboundMessage::Reading { stamp, reading })
    }
}

impl SignalSource for SimulatedSource {
    fn next_message(&mut self) -> Result<Option<InboundMessage>, ViewerError> {
        Ok(self.next_due(wallclock()))
    }
}
