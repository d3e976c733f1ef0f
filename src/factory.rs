use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::bus::{HardwareUnit, UnitRef};
use crate::device::{Device, DeviceData, DeviceIdentity, IDENTITY_RECORD_SIZE};
use crate::errors::{CreateError, CreateResult};
use crate::input::{InputSubsystem, Registration, SharedInput};
use crate::memory::{MemoryPool, ReportBuffer};
use crate::sensors::{SensorCatalog, SensorKind};

/// Builds and tears down sensor devices for a hardware unit
pub trait DeviceFactory: Send {
    /// Create and register the device for `kind`.
    ///
    /// On error nothing acquired during the call outlives it.
    fn create(&mut self, unit: &Arc<HardwareUnit>, kind: SensorKind) -> CreateResult<Device>;

    /// Unregister `device` and release its memory.
    ///
    /// Devices unregister themselves when dropped; this is the logged path.
    fn destroy(&mut self, device: Device);
}

/// Factory backed by a descriptor catalog, a memory pool and an input subsystem
pub struct SfhDeviceFactory {
    catalog: SensorCatalog,
    pool: MemoryPool,
    input: SharedInput,
}

impl SfhDeviceFactory {
    pub fn new(catalog: SensorCatalog, pool: MemoryPool, input: Box<dyn InputSubsystem>) -> Self {
        Self { catalog, pool, input: Arc::new(Mutex::new(input)) }
    }

    pub fn pool(&self) -> &MemoryPool {
        &self.pool
    }

    pub fn catalog(&self) -> &SensorCatalog {
        &self.catalog
    }
}

impl DeviceFactory for SfhDeviceFactory {
    fn create(&mut self, unit: &Arc<HardwareUnit>, kind: SensorKind) -> CreateResult<Device> {
        let record = self.pool.lease(IDENTITY_RECORD_SIZE).map_err(|source| {
            error!("[factory] unit {}: failed to allocate {} device: {}", unit.id(), kind, source);
            CreateError::AllocationFailed { kind, source }
        })?;

        let mut identity = DeviceIdentity::default();
        if identity.set_name(kind.name()) {
            warn!("[factory] {}: could not set device name", kind);
        }
        if identity.set_phys(unit.location()) {
            warn!("[factory] {}: could not set device location", kind);
        }

        // `record` and `identity` are released by drop on every early return below
        let report_size = self.catalog.report_size_of(kind).map_err(|source| {
            error!("[factory] {}: failed to get input descriptor size: {}", kind, source);
            CreateError::DescriptorUnavailable { kind, source }
        })?;

        let report = ReportBuffer::allocate(&self.pool, report_size).map_err(|source| {
            error!("[factory] {}: failed to allocate report buffer: {}", kind, source);
            CreateError::AllocationFailed { kind, source }
        })?;

        let data = DeviceData { kind, unit: UnitRef::new(unit), report };

        let registration = Registration::register(&self.input, &identity).map_err(|source| {
            error!("[factory] {}: failed to add device: {}", kind, source);
            CreateError::RegistrationFailed { kind, source }
        })?;

        info!(
            "[factory] {} registered as {} ({} byte reports)",
            kind, registration.id(), report_size
        );
        Ok(Device::new(identity, record, data, registration))
    }

    fn destroy(&mut self, device: Device) {
        let kind = device.kind();
        let registration = device.registration();
        drop(device);
        info!("[factory] {} ({}) destroyed", kind, registration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::simulated::SimulatedBus;
    use crate::descriptor::{ReportType, StaticDescriptorSizes};
    use crate::device::DEVICE_PHYS_LEN;
    use crate::errors::{AllocError, BusError, RegistrationError};
    use crate::input::{InputCore, RegistrationId};
    use crate::sensors::SensorMask;

    fn unit(location: &str) -> Arc<HardwareUnit> {
        HardwareUnit::new(0, location, Box::new(SimulatedBus::new(SensorMask::all())))
    }

    fn factory(sizes: StaticDescriptorSizes, pool: MemoryPool, input: InputCore) -> SfhDeviceFactory {
        SfhDeviceFactory::new(SensorCatalog::new(Box::new(sizes)), pool, Box::new(input))
    }

    #[test]
    fn test_create_sets_identity_and_buffer() {
        let unit = unit("bus0");
        let mut factory = factory(StaticDescriptorSizes::default(), MemoryPool::unbounded(), InputCore::default());

        let device = factory.create(&unit, SensorKind::AmbientLight).unwrap();
        assert_eq!(device.kind(), SensorKind::AmbientLight);
        assert_eq!(device.name(), "ambient light sensor");
        assert_eq!(device.identity().phys(), "bus0");
        assert_eq!(device.report_size(), 7);
        assert!(device.report().iter().all(|b| *b == 0));
        assert_eq!(device.unit().id(), 0);

        factory.destroy(device);
        assert_eq!(factory.pool().live_allocations(), 0);
    }

    #[test]
    fn test_long_location_is_not_fatal() {
        let unit = unit(&"p".repeat(200));
        let mut factory = factory(StaticDescriptorSizes::default(), MemoryPool::unbounded(), InputCore::default());

        let device = factory.create(&unit, SensorKind::Gyroscope).unwrap();
        assert_eq!(device.identity().phys().len(), DEVICE_PHYS_LEN - 1);
    }

    #[test]
    fn test_descriptor_failure_releases_record() {
        let unit = unit("bus0");
        let mut sizes = StaticDescriptorSizes::default();
        sizes.remove(SensorKind::Magnetometer, ReportType::Input);
        let mut factory = factory(sizes, MemoryPool::unbounded(), InputCore::default());

        let err = factory.create(&unit, SensorKind::Magnetometer).unwrap_err();
        assert!(matches!(err, CreateError::DescriptorUnavailable { kind: SensorKind::Magnetometer, .. }));
        assert_eq!(factory.pool().live_allocations(), 0);
    }

    #[test]
    fn test_buffer_allocation_failure_releases_record() {
        let unit = unit("bus0");
        // room for the identity record only
        let pool = MemoryPool::with_limit(IDENTITY_RECORD_SIZE);
        let mut factory = factory(StaticDescriptorSizes::default(), pool, InputCore::default());

        let err = factory.create(&unit, SensorKind::Accelerometer).unwrap_err();
        assert!(matches!(
            err,
            CreateError::AllocationFailed { source: AllocError::OutOfMemory { .. }, .. }
        ));
        assert_eq!(factory.pool().live_allocations(), 0);
        assert_eq!(factory.pool().in_use(), 0);
    }

    #[test]
    fn test_registration_failure_releases_everything() {
        let unit = unit("bus0");
        let mut factory = factory(StaticDescriptorSizes::default(), MemoryPool::unbounded(), InputCore::with_capacity(0));

        let err = factory.create(&unit, SensorKind::Gyroscope).unwrap_err();
        assert!(matches!(err, CreateError::RegistrationFailed { kind: SensorKind::Gyroscope, .. }));
        assert_eq!(factory.pool().live_allocations(), 0);
    }

    /// Counts live registrations across clones
    #[derive(Clone, Default)]
    struct LiveCount(Arc<Mutex<usize>>);

    impl InputSubsystem for LiveCount {
        fn register(&mut self, _identity: &DeviceIdentity) -> Result<RegistrationId, RegistrationError> {
            let mut live = self.0.lock().unwrap();
            *live += 1;
            Ok(RegistrationId(*live as u64))
        }

        fn unregister(&mut self, _id: RegistrationId) {
            *self.0.lock().unwrap() -= 1;
        }
    }

    #[test]
    fn test_dropped_device_is_unregistered() {
        let unit = unit("bus0");
        let live = LiveCount::default();
        let mut factory = SfhDeviceFactory::new(
            SensorCatalog::new(Box::new(StaticDescriptorSizes::default())),
            MemoryPool::unbounded(),
            Box::new(live.clone()),
        );

        let kept = factory.create(&unit, SensorKind::Accelerometer).unwrap();
        let dropped = factory.create(&unit, SensorKind::Magnetometer).unwrap();
        assert_eq!(*live.0.lock().unwrap(), 2);

        // no destroy call: dropping alone must withdraw the registration
        drop(dropped);
        assert_eq!(*live.0.lock().unwrap(), 1);

        factory.destroy(kept);
        assert_eq!(*live.0.lock().unwrap(), 0);
        assert_eq!(factory.pool().live_allocations(), 0);
    }

    #[test]
    fn test_poll_report_after_detach() {
        let unit = unit("bus0");
        let mut factory = factory(StaticDescriptorSizes::default(), MemoryPool::unbounded(), InputCore::default());
        let mut device = factory.create(&unit, SensorKind::Accelerometer).unwrap();

        let report = device.poll_report().unwrap().to_vec();
        assert_eq!(report.len(), 15);
        assert_eq!(report[0], 1);

        drop(unit);
        assert_eq!(device.poll_report().unwrap_err(), BusError::Detached);
    }
}
