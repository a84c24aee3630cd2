use std::fmt;

use serde::{Deserialize, Serialize};

const COMMON_REFERENCE: [&str; 10] = ["Fp1", "Fp2", "F7", "F8", "T3", "T4", "T5", "T6", "O1", "O2"];
const AVERAGE_REFERENCE: [&str; 10] = [
    "Fp1-Avg", "Fp2-Avg", "F7-Avg", "F8-Avg", "T3-Avg", "T4-Avg", "T5-Avg", "T6-Avg", "O1-Avg",
    "O2-Avg",
];
const LONGITUDINAL_BIPOLAR: [&str; 8] = [
    "Fp1-F7", "Fp2-F8", "F7-T3", "F8-T4", "T3-T5", "T4-T6", "T5-O1", "T6-O2",
];
const TRANSVERSE_BIPOLAR: [&str; 5] = ["Fp1-Fp2", "F7-F8", "T3-T4", "T5-T6", "O1-O2"];

/// Channel layout the headset is streaming. Exactly one is active per session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcquisitionMode {
    #[default]
    #[serde(rename = "Common Reference")]
    CommonReference,
    #[serde(rename = "Average Reference")]
    AverageReference,
    #[serde(rename = "Longitudinal-Bipolar")]
    LongitudinalBipolar,
    #[serde(rename = "Transverse-Bipolar")]
    TransverseBipolar,
}

impl AcquisitionMode {
    pub const ALL: [AcquisitionMode; 4] = [
        AcquisitionMode::CommonReference,
        AcquisitionMode::AverageReference,
        AcquisitionMode::LongitudinalBipolar,
        AcquisitionMode::TransverseBipolar,
    ];

    pub fn channel_names(self) -> &'static [&'static str] {
        match self {
            AcquisitionMode::CommonReference => &COMMON_REFERENCE,
            AcquisitionMode::AverageReference => &AVERAGE_REFERENCE,
            AcquisitionMode::LongitudinalBipolar => &LONGITUDINAL_BIPOLAR,
            AcquisitionMode::TransverseBipolar => &TRANSVERSE_BIPOLAR,
        }
    }

    pub fn channel_count(self) -> usize {
        self.channel_names().len()
    }

    pub fn channel_index(self, name: &str) -> Option<usize> {
        self.channel_names().iter().position(|c| *c == name)
    }

    pub fn label(self) -> &'static str {
        match self {
            AcquisitionMode::CommonReference => "Common Reference",
            AcquisitionMode::AverageReference => "Average Reference",
            AcquisitionMode::LongitudinalBipolar => "Longitudinal-Bipolar",
            AcquisitionMode::TransverseBipolar => "Transverse-Bipolar",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }

    /// Symmetric y-axis limit in volts used by the plot surface.
    pub fn y_limit_volts(self) -> f64 {
        match self {
            AcquisitionMode::CommonReference => 0.195,
            _ => 0.39,
        }
    }
}

impl fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
