use std::sync::atomic::{AtomicU32, Ordering};

use super::SensorBus;
use crate::errors::{BusError, BusResult};
use crate::sensors::{SensorKind, SensorMask};

// Common report header: report id, sensor state, event type
const SENSOR_STATE_READY: u8 = 0x02;
const EVENT_TYPE_DATA_UPDATED: u8 = 0x04;

/// In-process stand-in for the coprocessor.
///
/// Reports carry the common header followed by a little-endian sample counter
/// repeated across the payload, so consecutive reads are distinguishable.
pub struct SimulatedBus {
    mask: SensorMask,
    sequence: AtomicU32,
}

impl SimulatedBus {
    pub fn new(mask: SensorMask) -> Self {
        Self { mask, sequence: AtomicU32::new(0) }
    }
}

impl SensorBus for SimulatedBus {
    fn sensor_mask(&self) -> SensorMask {
        self.mask
    }

    fn read_input_report(&self, kind: SensorKind, buf: &mut [u8]) -> BusResult<usize> {
        if !self.mask.has(kind) {
            return Err(BusError::NotPresent { kind });
        }

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let header = [kind.ordinal() as u8 + 1, SENSOR_STATE_READY, EVENT_TYPE_DATA_UPDATED];
        let payload = seq.to_le_bytes();

        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = match header.get(i) {
                Some(h) => *h,
                None => payload[(i - header.len()) % payload.len()],
            };
        }
        Ok(buf.len())
    }
}
