//! Sensor catalog: the fixed set of sensor kinds the fusion hub can expose,
//! their hardware mask bits and display names.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::descriptor::{DescriptorProvider, ReportType};
use crate::errors::{DescriptorError, DescriptorResult};

/// Label returned for sensor indices outside the catalog
pub const UNKNOWN_SENSOR_NAME: &str = "unknown sensor type";

/// Physical sensors the coprocessor may advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
    Magnetometer,
    AmbientLight,
}

impl SensorKind {
    /// Number of known sensor kinds, and therefore registry slots
    pub const COUNT: usize = 4;

    /// Catalog order, used for both init and deinit
    pub const ALL: [SensorKind; SensorKind::COUNT] = [
        SensorKind::Accelerometer,
        SensorKind::Gyroscope,
        SensorKind::Magnetometer,
        SensorKind::AmbientLight,
    ];

    /// Registry slot index
    pub const fn ordinal(self) -> usize {
        match self {
            SensorKind::Accelerometer => 0,
            SensorKind::Gyroscope => 1,
            SensorKind::Magnetometer => 2,
            SensorKind::AmbientLight => 3,
        }
    }

    pub fn from_ordinal(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Bit advertised by the coprocessor for this sensor
    pub const fn mask(self) -> SensorMask {
        match self {
            SensorKind::Accelerometer => SensorMask::ACCEL,
            SensorKind::Gyroscope => SensorMask::GYRO,
            SensorKind::Magnetometer => SensorMask::MAGNO,
            SensorKind::AmbientLight => SensorMask::ALS,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::Magnetometer => "magnetometer",
            SensorKind::AmbientLight => "ambient light sensor",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Sensors present on the hub, as reported by the bus.
    ///
    /// Bit positions follow the coprocessor's sensor index numbering, so the
    /// ambient light sensor sits well above the motion sensors.
    #[derive(Default)]
    pub struct SensorMask: u32 {
        const ACCEL = 1 << 0;
        const GYRO  = 1 << 1;
        const MAGNO = 1 << 2;
        const ALS   = 1 << 19;
    }
}

impl SensorMask {
    pub fn has(self, kind: SensorKind) -> bool {
        self.contains(kind.mask())
    }

    /// Kinds whose bit is set, in catalog order
    pub fn kinds(self) -> impl Iterator<Item = SensorKind> {
        SensorKind::ALL.into_iter().filter(move |k| self.has(*k))
    }
}

impl FromIterator<SensorKind> for SensorMask {
    fn from_iter<I: IntoIterator<Item = SensorKind>>(iter: I) -> Self {
        iter.into_iter()
            .fold(SensorMask::empty(), |mask, kind| mask | kind.mask())
    }
}

/// Display name for a kind
pub fn name_of(kind: SensorKind) -> &'static str {
    kind.name()
}

/// Display name for a raw sensor index, falling back to a generic label
pub fn name_of_index(index: usize) -> &'static str {
    SensorKind::from_ordinal(index)
        .map(SensorKind::name)
        .unwrap_or(UNKNOWN_SENSOR_NAME)
}

/// Report sizing front-end over a descriptor provider
pub struct SensorCatalog {
    provider: Box<dyn DescriptorProvider + Send>,
}

impl SensorCatalog {
    pub fn new(provider: Box<dyn DescriptorProvider + Send>) -> Self {
        Self { provider }
    }

    /// Size of the input report for `kind`
    pub fn report_size_of(&self, kind: SensorKind) -> DescriptorResult<usize> {
        let size = self.provider.descriptor_size(kind, ReportType::Input)?;
        if size == 0 {
            return Err(DescriptorError::InvalidSize { kind, size });
        }
        Ok(size)
    }

    pub fn provider(&self) -> &dyn DescriptorProvider {
        self.provider.as_ref()
    }
}
