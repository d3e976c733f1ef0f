//! Report descriptor sizing.
//!
//! The descriptor encoders themselves live outside this crate; the client only
//! needs to know how many bytes each report occupies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::errors::{DescriptorError, DescriptorResult};
use crate::sensors::SensorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Input,
    Feature,
    Output,
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReportType::Input => "input",
            ReportType::Feature => "feature",
            ReportType::Output => "output",
        };
        f.write_str(s)
    }
}

/// Source of per-sensor report sizes
pub trait DescriptorProvider {
    fn descriptor_size(&self, kind: SensorKind, report_type: ReportType) -> DescriptorResult<usize>;
}

/// Report sizes for one sensor, as they appear in `[descriptors.<kind>]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSizes {
    pub input: Option<usize>,
    pub feature: Option<usize>,
    pub output: Option<usize>,
}

impl ReportSizes {
    pub fn get(&self, report_type: ReportType) -> Option<usize> {
        match report_type {
            ReportType::Input => self.input,
            ReportType::Feature => self.feature,
            ReportType::Output => self.output,
        }
    }

    fn slot_mut(&mut self, report_type: ReportType) -> &mut Option<usize> {
        match report_type {
            ReportType::Input => &mut self.input,
            ReportType::Feature => &mut self.feature,
            ReportType::Output => &mut self.output,
        }
    }
}

// Common report header: report id, sensor state, event type
const REPORT_HEADER_LEN: usize = 3;
const AXIS_LEN: usize = 4;

/// Default report layout: header plus one 32-bit field per channel.
/// The hub exposes no output reports.
fn default_sizes(kind: SensorKind) -> ReportSizes {
    let (input_channels, feature_channels) = match kind {
        SensorKind::Accelerometer | SensorKind::Gyroscope => (3, 3),
        // three axes plus heading accuracy
        SensorKind::Magnetometer => (4, 3),
        SensorKind::AmbientLight => (1, 3),
    };
    ReportSizes {
        input: Some(REPORT_HEADER_LEN + input_channels * AXIS_LEN),
        feature: Some(REPORT_HEADER_LEN + feature_channels * AXIS_LEN),
        output: None,
    }
}

/// Fixed descriptor-size table, with per-kind overrides from configuration
#[derive(Debug, Clone)]
pub struct StaticDescriptorSizes {
    sizes: HashMap<SensorKind, ReportSizes>,
}

impl Default for StaticDescriptorSizes {
    fn default() -> Self {
        let sizes = SensorKind::ALL
            .iter()
            .map(|kind| (*kind, default_sizes(*kind)))
            .collect();
        Self { sizes }
    }
}

impl StaticDescriptorSizes {
    /// Defaults overlaid with any sizes set in `overrides`
    pub fn with_overrides(overrides: &HashMap<SensorKind, ReportSizes>) -> Self {
        let mut table = Self::default();
        for (kind, sizes) in overrides {
            for report_type in [ReportType::Input, ReportType::Feature, ReportType::Output] {
                if let Some(size) = sizes.get(report_type) {
                    table.set(*kind, report_type, size);
                }
            }
        }
        table
    }

    pub fn set(&mut self, kind: SensorKind, report_type: ReportType, size: usize) {
        *self.sizes.entry(kind).or_default().slot_mut(report_type) = Some(size);
    }

    /// Drop the size for one report type, making lookups for it fail
    pub fn remove(&mut self, kind: SensorKind, report_type: ReportType) {
        if let Some(sizes) = self.sizes.get_mut(&kind) {
            *sizes.slot_mut(report_type) = None;
        }
    }
}

impl DescriptorProvider for StaticDescriptorSizes {
    fn descriptor_size(&self, kind: SensorKind, report_type: ReportType) -> DescriptorResult<usize> {
        self.sizes
            .get(&kind)
            .and_then(|sizes| sizes.get(report_type))
            .ok_or(DescriptorError::Unsupported { kind, report_type })
    }
}
