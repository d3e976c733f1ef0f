use serde::Serialize;

use crate::device::{Device, DeviceIdentity};
use crate::input::RegistrationId;
use crate::sensors::{SensorKind, SensorMask};

/// Live devices of one hardware unit, one slot per sensor kind
#[derive(Debug, Default)]
pub struct SensorRegistry {
    slots: [Option<Device>; SensorKind::COUNT],
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `device` in its kind's slot.
    ///
    /// An occupied slot is never overwritten; the rejected device is handed
    /// back so the caller can destroy it.
    pub fn insert(&mut self, device: Device) -> Result<(), Device> {
        let slot = &mut self.slots[device.kind().ordinal()];
        if slot.is_some() {
            return Err(device);
        }
        *slot = Some(device);
        Ok(())
    }

    /// Remove and return the device for `kind`, leaving the slot absent
    pub fn take(&mut self, kind: SensorKind) -> Option<Device> {
        self.slots[kind.ordinal()].take()
    }

    pub fn get(&self, kind: SensorKind) -> Option<&Device> {
        self.slots[kind.ordinal()].as_ref()
    }

    pub fn get_mut(&mut self, kind: SensorKind) -> Option<&mut Device> {
        self.slots[kind.ordinal()].as_mut()
    }

    pub fn is_present(&self, kind: SensorKind) -> bool {
        self.get(kind).is_some()
    }

    /// Present devices in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.slots.iter_mut().flatten()
    }

    /// Kinds with a live device
    pub fn present_mask(&self) -> SensorMask {
        self.iter().map(Device::kind).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn status(&self) -> RegistryStatus {
        let slots = SensorKind::ALL
            .iter()
            .map(|kind| SlotStatus {
                kind: *kind,
                device: self.get(*kind).map(|device| DeviceStatus {
                    registration: device.registration(),
                    identity: device.identity().clone(),
                    report_size: device.report_size(),
                }),
            })
            .collect();
        RegistryStatus { slots }
    }
}

/// Serializable snapshot of a registry
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatus {
    pub slots: Vec<SlotStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    pub kind: SensorKind,
    pub device: Option<DeviceStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub registration: RegistrationId,
    pub identity: DeviceIdentity,
    pub report_size: usize,
}

impl RegistryStatus {
    /// Serialize to JSON for debugging
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::simulated::SimulatedBus;
    use crate::bus::HardwareUnit;
    use crate::descriptor::StaticDescriptorSizes;
    use crate::factory::{DeviceFactory, SfhDeviceFactory};
    use crate::input::InputCore;
    use crate::memory::MemoryPool;
    use crate::sensors::SensorCatalog;

    fn factory() -> SfhDeviceFactory {
        SfhDeviceFactory::new(
            SensorCatalog::new(Box::new(StaticDescriptorSizes::default())),
            MemoryPool::unbounded(),
            Box::new(InputCore::default()),
        )
    }

    #[test]
    fn test_empty_registry() {
        let registry = SensorRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.present_mask(), SensorMask::empty());
        for kind in SensorKind::ALL {
            assert!(!registry.is_present(kind));
        }
    }

    #[test]
    fn test_insert_refuses_occupied_slot() {
        let unit = HardwareUnit::new(0, "bus0", Box::new(SimulatedBus::new(SensorMask::all())));
        let mut factory = factory();
        let mut registry = SensorRegistry::new();

        registry.insert(factory.create(&unit, SensorKind::Gyroscope).unwrap()).unwrap();
        let second = factory.create(&unit, SensorKind::Gyroscope).unwrap();
        let second_id = second.registration();

        let rejected = registry.insert(second).unwrap_err();
        assert_eq!(rejected.registration(), second_id);
        factory.destroy(rejected);
        assert_ne!(registry.get(SensorKind::Gyroscope).unwrap().registration(), second_id);
        assert_eq!(registry.present_mask(), SensorMask::GYRO);
    }

    #[test]
    fn test_status_snapshot() {
        let unit = HardwareUnit::new(3, "bus3", Box::new(SimulatedBus::new(SensorMask::all())));
        let mut factory = factory();
        let mut registry = SensorRegistry::new();
        registry.insert(factory.create(&unit, SensorKind::AmbientLight).unwrap()).unwrap();

        let status = registry.status();
        assert_eq!(status.slots.len(), SensorKind::COUNT);
        assert!(status.slots[0].device.is_none());
        assert_eq!(status.slots[3].device.as_ref().map(|d| d.report_size), Some(7));

        let json = status.to_json().unwrap();
        assert!(json.contains("ambient_light"));
        assert!(json.contains("ambient light sensor"));
    }

    #[test]
    fn test_take_clears_slot() {
        let unit = HardwareUnit::new(0, "bus0", Box::new(SimulatedBus::new(SensorMask::all())));
        let mut factory = factory();
        let mut registry = SensorRegistry::new();
        registry.insert(factory.create(&unit, SensorKind::Accelerometer).unwrap()).unwrap();

        let device = registry.take(SensorKind::Accelerometer).unwrap();
        assert!(registry.is_empty());
        assert!(registry.take(SensorKind::Accelerometer).is_none());
        factory.destroy(device);
    }
}
