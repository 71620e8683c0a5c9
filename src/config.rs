use std::path::Path;

use crate::foundation::error::{RaytileError, RaytileResult};

/// How frames are partitioned across execution contexts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One machine renders every tile.
    #[default]
    Local,
    /// This process is one of `num_devices` local devices sharing a frame buffer.
    Interleaved {
        /// This device, `0 <= device_id < num_devices`.
        device_id: usize,
        /// Number of cooperating devices.
        num_devices: usize,
    },
}

/// Startup configuration of a [`Device`](crate::Device).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// Load balancing strategy.
    pub mode: ExecutionMode,
    /// Use a rayon pool when `true`, render tiles on the calling thread otherwise.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Local,
            parallel: true,
            threads: None,
        }
    }
}

impl DeviceConfig {
    /// Parse and validate a JSON config, e.g.
    /// `{"mode": {"kind": "interleaved", "device_id": 1, "num_devices": 4}, "threads": 8}`.
    pub fn from_json_str(s: &str) -> RaytileResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| RaytileError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> RaytileResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check device ids and thread counts.
    pub fn validate(&self) -> RaytileResult<()> {
        if let ExecutionMode::Interleaved {
            device_id,
            num_devices,
        } = self.mode
        {
            if num_devices == 0 {
                return Err(RaytileError::validation("num_devices must be >= 1"));
            }
            if device_id >= num_devices {
                return Err(RaytileError::validation(format!(
                    "device_id {device_id} out of range for {num_devices} device(s)"
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(RaytileError::validation(
                "'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
