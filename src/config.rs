//! Machine configuration.
//!
//! Configuration can be read from a JSON file; any field left out takes
//! its default. Command-line flags are applied on top by the driver.
//!
//! ```json
//! { "memory_size": 256, "max_cycles": 100000, "output": "decimal" }
//! ```

use crate::cpu::{Cpu, Memory, MemoryError};
use crate::output::OutputMode;
use serde::{Serialize, Deserialize};
use std::path::Path;
use thiserror::Error;

/// Default cycle cap for the command-line driver.
pub const DEFAULT_MAX_CYCLES: u64 = 100_000;

/// Settings for building and driving a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Number of memory cells (power of two, at most 256).
    pub memory_size: usize,
    /// Stop after this many instructions; 0 means no limit.
    pub max_cycles: u64,
    /// How PRN output is presented.
    pub output: OutputMode,
    /// Pause between steps in microseconds (driver cadence only).
    pub step_interval_us: u64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: crate::cpu::memory::MEMORY_SIZE,
            max_cycles: DEFAULT_MAX_CYCLES,
            output: OutputMode::Raw,
            step_interval_us: 0,
        }
    }
}

impl MachineConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Check that the settings describe a buildable machine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Memory::with_size(self.memory_size)?;
        Ok(())
    }

    /// Cycle cap as an option.
    pub fn cycle_limit(&self) -> Option<u64> {
        (self.max_cycles > 0).then_some(self.max_cycles)
    }

    /// Build a fresh CPU with memory sized per this configuration.
    pub fn build_cpu(&self) -> Result<Cpu, ConfigError> {
        Ok(Cpu::with_memory(Memory::with_size(self.memory_size)?))
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid config: {0}")]
    Parse(String),

    #[error(transparent)]
    Memory(#[from] MemoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MachineConfig::default();

        assert_eq!(config.memory_size, 256);
        assert_eq!(config.output, OutputMode::Raw);
        assert_eq!(config.cycle_limit(), Some(DEFAULT_MAX_CYCLES));
    }

    #[test]
    fn test_partial_json() {
        let config = MachineConfig::from_json(r#"{ "output": "decimal", "max_cycles": 0 }"#).unwrap();

        assert_eq!(config.output, OutputMode::Decimal);
        assert_eq!(config.cycle_limit(), None);
        assert_eq!(config.memory_size, 256);
    }

    #[test]
    fn test_rejects_bad_memory_size() {
        let err = MachineConfig::from_json(r#"{ "memory_size": 300 }"#).unwrap_err();
        assert_eq!(err, ConfigError::Memory(MemoryError::InvalidSize(300)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            MachineConfig::from_json("{ memory_size"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_build_cpu() {
        let config = MachineConfig { memory_size: 64, ..Default::default() };
        let cpu = config.build_cpu().unwrap();

        assert_eq!(cpu.mem.len(), 64);
        assert!(cpu.is_running());
    }
}
