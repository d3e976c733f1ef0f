pub mod simulated;

use std::fmt;
use std::sync::{Arc, Weak};

use crate::errors::BusResult;
use crate::sensors::{SensorKind, SensorMask};

/// Transport to the sensor fusion coprocessor
pub trait SensorBus: Send + Sync {
    /// Sensors currently advertised by the hub
    fn sensor_mask(&self) -> SensorMask;

    /// Copy the latest input report for `kind` into `buf`, returning its length
    fn read_input_report(&self, kind: SensorKind, buf: &mut [u8]) -> BusResult<usize>;
}

/// One attached coprocessor
pub struct HardwareUnit {
    id: u32,
    location: String,
    bus: Box<dyn SensorBus>,
}

impl HardwareUnit {
    pub fn new(id: u32, location: impl Into<String>, bus: Box<dyn SensorBus>) -> Arc<Self> {
        Arc::new(Self { id, location: location.into(), bus })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Physical location string given to every device of this unit
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn bus(&self) -> &dyn SensorBus {
        self.bus.as_ref()
    }

    pub fn sensor_mask(&self) -> SensorMask {
        self.bus.sensor_mask()
    }
}

impl fmt::Debug for HardwareUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardwareUnit")
            .field("id", &self.id)
            .field("location", &self.location)
            .finish()
    }
}

/// Non-owning handle from a device back to its unit
#[derive(Debug, Clone)]
pub struct UnitRef {
    id: u32,
    unit: Weak<HardwareUnit>,
}

impl UnitRef {
    pub fn new(unit: &Arc<HardwareUnit>) -> Self {
        Self { id: unit.id, unit: Arc::downgrade(unit) }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// The unit, if it is still attached
    pub fn upgrade(&self) -> Option<Arc<HardwareUnit>> {
        self.unit.upgrade()
    }
}
