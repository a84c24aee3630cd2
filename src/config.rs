// src/config.rs
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::drivers::ingest::FLUSH_INTERVAL;
use crate::drivers::{AcquisitionMode, FilterParams};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "EEGVIEW_CONFIG";
/// Config file looked up in the working directory when the variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "eegview.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Mode the live viewer subscribes to at start.
    pub mode: AcquisitionMode,
    /// Device names offered by the simulator.
    pub simulated_devices: Vec<String>,
    pub sample_rate_hz: f64,
    /// Stream seconds between two UI refreshes.
    pub flush_interval_s: f64,
    /// Where session logs are loaded from and saved to.
    pub log_dir: PathBuf,
    pub filter: FilterParams,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            mode: AcquisitionMode::default(),
            simulated_devices: vec!["GT-Sim-01".to_owned()],
            sample_rate_hz: 250.0,
            flush_interval_s: FLUSH_INTERVAL,
            log_dir: PathBuf::from("."),
            filter: FilterParams::default(),
        }
    }
}

impl ViewerConfig {
    /// Reads the file named by `EEGVIEW_CONFIG`, else `eegview.json`.
    /// A missing default file yields the defaults; a named file must exist.
    pub fn load() -> Result<Self> {
        match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(Path::new(&path)),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_path(path)
                } else {
                    log::info!("no {DEFAULT_CONFIG_FILE}, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        log::info!("config loaded from {}", path.display());
        Ok(config)
    }

    /// Default file name for a save, inside `log_dir`.
    pub fn session_path(&self, name: &str) -> PathBuf {
        self.log_dir.join(format!("{name}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"mode": "Longitudinal-Bipolar", "sample_rate_hz": 500.0}}"#
        )
        .unwrap();
        let config = ViewerConfig::from_path(file.path()).unwrap();
        assert_eq!(config.mode, AcquisitionMode::LongitudinalBipolar);
        assert_eq!(config.sample_rate_hz, 500.0);
        assert_eq!(config.flush_interval_s, FLUSH_INTERVAL);
        assert_eq!(config.simulated_devices, ViewerConfig::default().simulated_devices);
    }

    #[test]
    fn bad_files_are_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"mode": "Bipolar"}}"#).unwrap();
        let err = ViewerConfig::from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid config"));
        assert!(ViewerConfig::from_path(Path::new("/nonexistent/eegview.json")).is_err());
    }

    #[test]
    fn session_path_joins_log_dir() {
        let config = ViewerConfig {
            log_dir: PathBuf::from("/data/eeg"),
            ..Default::default()
        };
        assert_eq!(
            config.session_path("run1"),
            PathBuf::from("/data/eeg/run1.json")
        );
    }
}
