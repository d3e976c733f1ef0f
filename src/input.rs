//! Input-abstraction layer seam.
//!
//! Devices are announced to the input subsystem on creation and withdrawn on
//! destruction; the subsystem keeps its own bookkeeping keyed by the
//! [`RegistrationId`] it hands out.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use crate::device::DeviceIdentity;
use crate::errors::RegistrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegistrationId(pub u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input{}", self.0)
    }
}

pub trait InputSubsystem: Send {
    fn register(&mut self, identity: &DeviceIdentity) -> Result<RegistrationId, RegistrationError>;
    fn unregister(&mut self, id: RegistrationId);
}

/// Input subsystem shared between a factory and the devices it registered
pub type SharedInput = Arc<Mutex<Box<dyn InputSubsystem>>>;

/// A live entry in the input subsystem, withdrawn when dropped.
///
/// Every device owns one, so a device can never be released while the input
/// subsystem still lists it.
pub struct Registration {
    id: RegistrationId,
    input: SharedInput,
}

impl Registration {
    pub fn register(input: &SharedInput, identity: &DeviceIdentity) -> Result<Self, RegistrationError> {
        let id = input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register(identity)?;
        Ok(Self { id, input: input.clone() })
    }

    pub fn id(&self) -> RegistrationId {
        self.id
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Registration").field(&self.id).finish()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unregister(self.id);
    }
}

/// In-memory input subsystem with a bounded device table
#[derive(Debug)]
pub struct InputCore {
    capacity: usize,
    next_id: u64,
    devices: BTreeMap<RegistrationId, DeviceIdentity>,
}

impl Default for InputCore {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl InputCore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, next_id: 0, devices: BTreeMap::new() }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, id: RegistrationId) -> Option<&DeviceIdentity> {
        self.devices.get(&id)
    }
}

impl InputSubsystem for InputCore {
    fn register(&mut self, identity: &DeviceIdentity) -> Result<RegistrationId, RegistrationError> {
        if self.devices.len() >= self.capacity {
            return Err(RegistrationError::Exhausted { capacity: self.capacity });
        }

        let id = RegistrationId(self.next_id);
        self.next_id += 1;
        self.devices.insert(id, identity.clone());
        info!("[input] {}: {} on {}", id, identity.name(), identity.phys());
        Ok(id)
    }

    fn unregister(&mut self, id: RegistrationId) {
        match self.devices.remove(&id) {
            Some(identity) => info!("[input] {}: {} removed", id, identity.name()),
            None => debug!("[input] {}: not registered", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SensorKind;

    #[test]
    fn test_register_unregister() {
        let mut core = InputCore::default();
        let identity = DeviceIdentity::for_sensor(SensorKind::Gyroscope, "bus0");

        let id = core.register(&identity).unwrap();
        assert_eq!(core.len(), 1);
        assert_eq!(core.get(id).map(|d| d.name()), Some("gyroscope"));

        core.unregister(id);
        assert!(core.is_empty());

        // unknown ids are ignored
        core.unregister(id);
        assert!(core.is_empty());
    }

    #[derive(Default)]
    struct CountingInput {
        live: Arc<Mutex<usize>>,
    }

    impl InputSubsystem for CountingInput {
        fn register(&mut self, _identity: &DeviceIdentity) -> Result<RegistrationId, RegistrationError> {
            let mut live = self.live.lock().unwrap();
            *live += 1;
            Ok(RegistrationId(*live as u64))
        }

        fn unregister(&mut self, _id: RegistrationId) {
            *self.live.lock().unwrap() -= 1;
        }
    }

    #[test]
    fn test_registration_withdrawn_on_drop() {
        let counting = CountingInput::default();
        let live = counting.live.clone();
        let input: SharedInput = Arc::new(Mutex::new(Box::new(counting)));
        let identity = DeviceIdentity::for_sensor(SensorKind::Magnetometer, "bus0");

        let first = Registration::register(&input, &identity).unwrap();
        let second = Registration::register(&input, &identity).unwrap();
        assert_eq!(*live.lock().unwrap(), 2);

        drop(first);
        assert_eq!(*live.lock().unwrap(), 1);
        drop(second);
        assert_eq!(*live.lock().unwrap(), 0);
    }

    #[test]
    fn test_capacity_exhausted() {
        let mut core = InputCore::with_capacity(1);
        let identity = DeviceIdentity::for_sensor(SensorKind::Accelerometer, "bus0");

        let first = core.register(&identity).unwrap();
        assert_eq!(
            core.register(&identity),
            Err(RegistrationError::Exhausted { capacity: 1 })
        );

        core.unregister(first);
        let second = core.register(&identity).unwrap();
        assert_ne!(first, second);
    }
}
