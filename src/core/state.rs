//! Device state records

use serde::{Deserialize, Serialize};

/// Hardware identity of the connected device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hardware {
    /// Marketing model name
    pub model: String,
    /// Model number (e.g. "A2643")
    pub model_number: String,
    /// Sales region code
    pub region: String,
}

impl Hardware {
    /// Check if the record is still the empty default
    pub fn is_empty(&self) -> bool {
        self.model.is_empty() && self.model_number.is_empty() && self.region.is_empty()
    }
}

/// Battery readings of the connected device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    /// Charge level in percent
    pub battery_level: f64,
    /// Health in percent of design capacity
    pub battery_health: f64,
    /// Charge cycle count
    pub cycle_counts: f64,
}

impl Battery {
    pub fn is_empty(&self) -> bool {
        self.battery_level == 0.0 && self.battery_health == 0.0 && self.cycle_counts == 0.0
    }
}

/// Operating system of the connected device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Os {
    pub ios_ver: String,
    pub build_num: String,
}

impl Os {
    pub fn is_empty(&self) -> bool {
        self.ios_ver.is_empty() && self.build_num.is_empty()
    }
}

/// Storage capacity of the connected device, in the backend's units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    pub total_storage: f64,
    pub used_storage: f64,
    pub available_storage: f64,
}

impl Storage {
    pub fn is_empty(&self) -> bool {
        self.total_storage == 0.0 && self.used_storage == 0.0 && self.available_storage == 0.0
    }
}
