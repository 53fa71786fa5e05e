use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Advertised name prefix shared by all Sinilink amplifiers.
pub const DEVICE_NAME_PREFIX: &str = "Sinilink-APP";

/// Check whether an advertised local name belongs to a Sinilink amplifier.
pub fn matches_device_name(name: &str) -> bool {
    name.starts_with(DEVICE_NAME_PREFIX)
}

/// Input source selectable on the amplifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Aux,
    Bluetooth,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Aux => "aux",
            Source::Bluetooth => "bluetooth",
        }
    }
}

/// Error type for invalid source strings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseSourceError;

impl std::fmt::Display for ParseSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid source value")
    }
}

impl std::error::Error for ParseSourceError {}

impl FromStr for Source {
    type Err = ParseSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aux" => Ok(Source::Aux),
            "bluetooth" => Ok(Source::Bluetooth),
            _ => Err(ParseSourceError),
        }
    }
}

/// An amplifier found during a BLE scan
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredAmp {
    /// Advertised local name (always starts with [`DEVICE_NAME_PREFIX`])
    pub name: String,
    /// Hardware address, as reported by the BLE stack
    pub address: String,
    /// Signal strength at discovery time, if the stack reported one
    #[serde(default)]
    pub rssi: Option<i16>,
}
