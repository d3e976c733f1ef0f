use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

use crate::descriptor::ReportSizes;
use crate::device::SFH_PHYS_DEVICE;
use crate::errors::{ConfigError, ConfigResult};
use crate::sensors::{SensorKind, SensorMask};

/// Root of `hub.toml`
#[derive(Debug, Deserialize)]
pub struct HubConfig {
    pub unit: UnitConfig,
    #[serde(default)]
    pub descriptors: DescriptorOverrides,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// `[unit]` section: the attached hub and what it advertises
#[derive(Debug, Deserialize)]
pub struct UnitConfig {
    #[serde(default)]
    pub id: u32,
    #[serde(default = "default_location")]
    pub location: String,
    /// Raw sensor bitmask as the hub would report it
    pub sensor_mask: u32,
}

fn default_location() -> String {
    SFH_PHYS_DEVICE.to_string()
}

/// `[descriptors.<sensor>]` tables overriding default report sizes.
/// Misspelled sensor names are rejected rather than silently ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptorOverrides {
    pub accelerometer: Option<ReportSizes>,
    pub gyroscope: Option<ReportSizes>,
    pub magnetometer: Option<ReportSizes>,
    pub ambient_light: Option<ReportSizes>,
}

impl DescriptorOverrides {
    pub fn get(&self, kind: SensorKind) -> Option<&ReportSizes> {
        match kind {
            SensorKind::Accelerometer => self.accelerometer.as_ref(),
            SensorKind::Gyroscope => self.gyroscope.as_ref(),
            SensorKind::Magnetometer => self.magnetometer.as_ref(),
            SensorKind::AmbientLight => self.ambient_light.as_ref(),
        }
    }

    pub fn to_map(&self) -> HashMap<SensorKind, ReportSizes> {
        SensorKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind).map(|sizes| (*kind, *sizes)))
            .collect()
    }
}

/// `[memory]` section
#[derive(Debug, Default, Deserialize)]
pub struct MemoryConfig {
    /// Byte budget for identity records and report buffers; unbounded if unset
    pub limit_bytes: Option<usize>,
}

/// `[scheduler]` section
#[derive(Debug, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { poll_interval_ms: default_poll_interval_ms() }
    }
}

impl HubConfig {
    pub fn sensor_mask(&self) -> SensorMask {
        SensorMask::from_bits_truncate(self.unit.sensor_mask)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let unknown = self.unit.sensor_mask & !SensorMask::all().bits();
        if unknown != 0 {
            tracing::warn!("[config] ignoring unknown sensor mask bits {:#010x}", unknown);
        }

        if self.scheduler.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.poll_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        for kind in SensorKind::ALL {
            if let Some(ReportSizes { input: Some(0), .. }) = self.descriptors.get(kind) {
                return Err(ConfigError::InvalidValue {
                    field: format!("descriptors.{}.input", field_name(kind)),
                    reason: "input report size must be non-zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn field_name(kind: SensorKind) -> &'static str {
    match kind {
        SensorKind::Accelerometer => "accelerometer",
        SensorKind::Gyroscope => "gyroscope",
        SensorKind::Magnetometer => "magnetometer",
        SensorKind::AmbientLight => "ambient_light",
    }
}

/// Parse and validate hub configuration from TOML text
pub fn parse_hub_config(content: &str) -> ConfigResult<HubConfig> {
    let parsed: HubConfig = toml::from_str(content)?;
    parsed.validate()?;
    Ok(parsed)
}

/// Loads config from TOML file
pub fn load_hub_config(path: &str) -> ConfigResult<HubConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    parse_hub_config(&content)
}
