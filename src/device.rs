use serde::Serialize;

use crate::bus::UnitRef;
use crate::errors::{BusError, BusResult};
use crate::input::{Registration, RegistrationId};
use crate::memory::{Lease, ReportBuffer};
use crate::sensors::SensorKind;

/// Capacity of the identity name field, terminator included
pub const DEVICE_NAME_LEN: usize = 128;
/// Capacity of the physical location field, terminator included
pub const DEVICE_PHYS_LEN: usize = 64;

pub const SFH_VENDOR_ID: u16 = 0x03fe;
pub const SFH_PRODUCT_ID: u16 = 0x0001;
pub const SFH_VERSION: u16 = 0x0001;

/// Default physical location of the hub
pub const SFH_PHYS_DEVICE: &str = "AMD Sensor Fusion Hub (PCIe)";

/// Bytes charged against the memory pool for one identity record
pub const IDENTITY_RECORD_SIZE: usize =
    std::mem::size_of::<DeviceIdentity>() + DEVICE_NAME_LEN + DEVICE_PHYS_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BusType {
    I2c,
}

impl BusType {
    /// Numeric bus code as seen by input consumers
    pub const fn code(self) -> u16 {
        match self {
            BusType::I2c => 0x18,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceGroup {
    SensorHub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Other,
}

/// Copy `src` into a field holding `capacity` bytes including a terminator.
///
/// Returns the stored string and whether it was cut short. Truncation always
/// lands on a char boundary.
pub fn copy_capped(src: &str, capacity: usize) -> (String, bool) {
    let max = capacity.saturating_sub(1);
    if src.len() <= max {
        return (src.to_string(), false);
    }

    let mut end = max;
    while !src.is_char_boundary(end) {
        end -= 1;
    }
    (src[..end].to_string(), true)
}

/// Identity fields announced to the input subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub bus: BusType,
    pub group: DeviceGroup,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    pub device_type: DeviceType,
    name: String,
    phys: String,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            bus: BusType::I2c,
            group: DeviceGroup::SensorHub,
            vendor: SFH_VENDOR_ID,
            product: SFH_PRODUCT_ID,
            version: SFH_VERSION,
            device_type: DeviceType::Other,
            name: String::new(),
            phys: String::new(),
        }
    }
}

impl DeviceIdentity {
    /// Identity for `kind`, ignoring truncation
    pub fn for_sensor(kind: SensorKind, phys: &str) -> Self {
        let mut identity = Self::default();
        identity.set_name(kind.name());
        identity.set_phys(phys);
        identity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phys(&self) -> &str {
        &self.phys
    }

    /// Returns true if the name had to be truncated
    pub fn set_name(&mut self, name: &str) -> bool {
        let (name, truncated) = copy_capped(name, DEVICE_NAME_LEN);
        self.name = name;
        truncated
    }

    /// Returns true if the location had to be truncated
    pub fn set_phys(&mut self, phys: &str) -> bool {
        let (phys, truncated) = copy_capped(phys, DEVICE_PHYS_LEN);
        self.phys = phys;
        truncated
    }
}

/// Driver-private data attached to a device
#[derive(Debug)]
pub struct DeviceData {
    pub(crate) kind: SensorKind,
    pub(crate) unit: UnitRef,
    pub(crate) report: ReportBuffer,
}

/// A sensor endpoint registered with the input subsystem.
///
/// Only the device factory builds these. Dropping a device unregisters it
/// before its identity record and report buffer are released.
#[derive(Debug)]
pub struct Device {
    // fields drop in order: unregister first, then free memory
    registration: Registration,
    identity: DeviceIdentity,
    data: DeviceData,
    _record: Lease,
}

impl Device {
    pub(crate) fn new(
        identity: DeviceIdentity,
        record: Lease,
        data: DeviceData,
        registration: Registration,
    ) -> Self {
        Self { registration, identity, data, _record: record }
    }

    pub fn kind(&self) -> SensorKind {
        self.data.kind
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn registration(&self) -> RegistrationId {
        self.registration.id()
    }

    pub fn unit(&self) -> &UnitRef {
        &self.data.unit
    }

    pub fn report_size(&self) -> usize {
        self.data.report.len()
    }

    /// Most recent input report
    pub fn report(&self) -> &[u8] {
        self.data.report.as_slice()
    }

    /// Refresh the report buffer from the hardware unit
    pub fn poll_report(&mut self) -> BusResult<&[u8]> {
        let unit = self.data.unit.upgrade().ok_or(BusError::Detached)?;
        let kind = self.data.kind;
        let capacity = self.data.report.len();

        let len = unit.bus().read_input_report(kind, self.data.report.as_mut_slice())?;
        if len > capacity {
            return Err(BusError::ReportTooLarge { kind, actual: len, capacity });
        }
        Ok(&self.data.report.as_slice()[..len])
    }
}
