//! Client init/deinit for one sensor fusion hub.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::bus::HardwareUnit;
use crate::device::Device;
use crate::errors::{LifecycleError, LifecycleResult};
use crate::factory::DeviceFactory;
use crate::registry::SensorRegistry;
use crate::sensors::SensorKind;

/// Create a device for every sensor the unit advertises.
///
/// The mask is read once per call. A kind whose creation fails is left absent
/// and the remaining kinds are still attempted.
pub fn init(unit: &Arc<HardwareUnit>, factory: &mut dyn DeviceFactory) -> SensorRegistry {
    let mask = unit.sensor_mask();
    info!("[lifecycle] unit {}: sensor mask {:#010x}", unit.id(), mask.bits());

    let mut registry = SensorRegistry::new();
    for kind in SensorKind::ALL {
        if !mask.has(kind) {
            debug!("[lifecycle] unit {}: {} not present", unit.id(), kind);
            continue;
        }

        match factory.create(unit, kind) {
            Ok(device) => {
                // a fresh registry has every slot empty
                if let Err(device) = registry.insert(device) {
                    factory.destroy(device);
                }
            }
            Err(e) => warn!("[lifecycle] unit {}: {} unavailable: {}", unit.id(), kind, e),
        }
    }

    info!(
        "[lifecycle] unit {}: {} of {} advertised sensor(s) active",
        unit.id(),
        registry.len(),
        mask.kinds().count()
    );
    registry
}

/// Destroy every live device, leaving all slots absent.
///
/// Returns the number of devices destroyed; zero on an empty registry.
pub fn deinit(registry: &mut SensorRegistry, factory: &mut dyn DeviceFactory) -> usize {
    let mut destroyed = 0;
    for kind in SensorKind::ALL {
        if let Some(device) = registry.take(kind) {
            factory.destroy(device);
            destroyed += 1;
        }
    }
    destroyed
}

/// Per-unit owner of the device factory and registry.
///
/// Dropping the client tears down any remaining devices before the unit
/// reference is released.
pub struct SensorHubClient {
    unit: Arc<HardwareUnit>,
    factory: Box<dyn DeviceFactory>,
    registry: SensorRegistry,
    initialized: bool,
}

impl SensorHubClient {
    pub fn new(unit: Arc<HardwareUnit>, factory: Box<dyn DeviceFactory>) -> Self {
        Self { unit, factory, registry: SensorRegistry::new(), initialized: false }
    }

    /// Probe the unit's sensors. Fails if a previous init was not undone.
    pub fn init(&mut self) -> LifecycleResult<&SensorRegistry> {
        if self.initialized {
            let live = self.registry.len();
            error!("[lifecycle] unit {}: init called twice ({} live devices)", self.unit.id(), live);
            return Err(LifecycleError::AlreadyInitialized { unit: self.unit.id(), live });
        }

        self.registry = init(&self.unit, self.factory.as_mut());
        self.initialized = true;
        Ok(&self.registry)
    }

    /// Tear down all devices. Safe to call repeatedly.
    pub fn deinit(&mut self) -> usize {
        let destroyed = deinit(&mut self.registry, self.factory.as_mut());
        if self.initialized {
            info!("[lifecycle] unit {}: {} device(s) removed", self.unit.id(), destroyed);
        }
        self.initialized = false;
        destroyed
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn unit(&self) -> &Arc<HardwareUnit> {
        &self.unit
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    /// Live devices in catalog order, for report polling.
    ///
    /// Slots cannot be emptied or refilled through this; only `init` and
    /// `deinit` change which devices exist.
    pub fn devices_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.registry.iter_mut()
    }
}

impl Drop for SensorHubClient {
    fn drop(&mut self) {
        self.deinit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::simulated::SimulatedBus;
    use crate::descriptor::StaticDescriptorSizes;
    use crate::factory::SfhDeviceFactory;
    use crate::input::InputCore;
    use crate::memory::MemoryPool;
    use crate::sensors::{SensorCatalog, SensorMask};

    fn client(mask: SensorMask, pool: MemoryPool) -> SensorHubClient {
        let unit = HardwareUnit::new(1, "bus1", Box::new(SimulatedBus::new(mask)));
        let factory = SfhDeviceFactory::new(
            SensorCatalog::new(Box::new(StaticDescriptorSizes::default())),
            pool,
            Box::new(InputCore::default()),
        );
        SensorHubClient::new(unit, Box::new(factory))
    }

    #[test]
    fn test_double_init_rejected() {
        let mut client = client(SensorMask::ACCEL | SensorMask::GYRO, MemoryPool::unbounded());
        assert_eq!(client.init().unwrap().len(), 2);

        assert_eq!(
            client.init().unwrap_err(),
            LifecycleError::AlreadyInitialized { unit: 1, live: 2 }
        );
        // the existing devices are untouched
        assert_eq!(client.registry().present_mask(), SensorMask::ACCEL | SensorMask::GYRO);
    }

    #[test]
    fn test_reinit_after_deinit() {
        let mut client = client(SensorMask::all(), MemoryPool::unbounded());
        client.init().unwrap();
        assert_eq!(client.deinit(), 4);
        assert!(!client.is_initialized());

        assert_eq!(client.init().unwrap().len(), 4);
    }

    #[test]
    fn test_drop_releases_devices() {
        let pool = MemoryPool::unbounded();
        let mut client = client(SensorMask::all(), pool.clone());
        client.init().unwrap();
        assert!(pool.live_allocations() > 0);

        drop(client);
        assert_eq!(pool.live_allocations(), 0);
    }

    #[test]
    fn test_poll_present_devices() {
        let mut client = client(SensorMask::MAGNO, MemoryPool::unbounded());
        client.init().unwrap();

        let device = client.devices_mut().next().unwrap();
        assert_eq!(device.kind(), SensorKind::Magnetometer);
        let report = device.poll_report().unwrap();
        assert_eq!(report.len(), 19);
        assert_eq!(report[0], 3);
    }

    #[test]
    fn test_devices_mut_keeps_registry_intact() {
        let pool = MemoryPool::unbounded();
        let mut client = client(SensorMask::ACCEL | SensorMask::ALS, pool.clone());
        client.init().unwrap();

        let polled = client.devices_mut().filter_map(|d| d.poll_report().ok().map(|r| r.len())).count();
        assert_eq!(polled, 2);

        // every device handed out for polling is still destroyed by deinit
        assert_eq!(client.deinit(), 2);
        assert_eq!(pool.live_allocations(), 0);
    }
}
