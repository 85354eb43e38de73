use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::drivers::{ScopeError, ScopeResult, SerialSettings, SimulationSettings};
use crate::types::WINDOW_CAPACITY;

/// Where the byte stream comes from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    Serial(SerialSettings),
    Simulation(SimulationSettings),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Simulation(SimulationSettings::default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScopeConfig {
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    #[serde(default = "default_autoscale")]
    pub autoscale: bool,
    #[serde(default)]
    pub source: SourceConfig,
}

fn default_window_capacity() -> usize {
    WINDOW_CAPACITY
}

fn default_autoscale() -> bool {
    true
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            autoscale: default_autoscale(),
            source: SourceConfig::default(),
        }
    }
}

impl ScopeConfig {
    pub fn from_json(text: &str) -> ScopeResult<Self> {
        let config: ScopeConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ScopeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ScopeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> ScopeResult<()> {
        if self.window_capacity == 0 {
            return Err(ScopeError::InvalidCapacity);
        }
        match &self.source {
            SourceConfig::Serial(serial) => {
                if serial.port.trim().is_empty() {
                    return Err(ScopeError::Config("serial port name is empty".into()));
                }
                if serial.baud_rate == 0 {
                    return Err(ScopeError::Config("baud rate must be non-zero".into()));
                }
            }
            SourceConfig::Simulation(sim) => {
                if sim.max_chunk == 0 {
                    return Err(ScopeError::Config("max_chunk must be non-zero".into()));
                }
            }
        }
        Ok(())
    }
}
