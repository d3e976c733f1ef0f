//! Accounted memory for device identity records and report buffers.
//!
//! Every allocation holds a [`Lease`] against a [`MemoryPool`]; dropping the
//! owner returns the bytes, so a device's memory is released exactly when the
//! device itself goes away.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::{AllocError, AllocResult};

#[derive(Debug, Default)]
struct PoolState {
    in_use: AtomicUsize,
    live: AtomicUsize,
}

/// Byte budget shared by all devices of one hardware unit
#[derive(Debug, Clone)]
pub struct MemoryPool {
    limit: Option<usize>,
    state: Arc<PoolState>,
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl MemoryPool {
    pub fn unbounded() -> Self {
        Self { limit: None, state: Arc::default() }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit), state: Arc::default() }
    }

    /// Reserve `size` bytes against the budget
    pub fn lease(&self, size: usize) -> AllocResult<Lease> {
        let reserved = self
            .state
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |in_use| {
                let next = in_use.checked_add(size)?;
                match self.limit {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            });

        if let Err(in_use) = reserved {
            let available = self.limit.map_or(usize::MAX, |l| l.saturating_sub(in_use));
            return Err(AllocError::OutOfMemory { requested: size, available });
        }

        self.state.live.fetch_add(1, Ordering::AcqRel);
        Ok(Lease { size, state: self.state.clone() })
    }

    /// Bytes currently leased out
    pub fn in_use(&self) -> usize {
        self.state.in_use.load(Ordering::Acquire)
    }

    /// Number of outstanding leases
    pub fn live_allocations(&self) -> usize {
        self.state.live.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

/// Reservation returned to its pool on drop
pub struct Lease {
    size: usize,
    state: Arc<PoolState>,
}

impl Lease {
    pub fn size(&self) -> usize {
        self.size
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").field("size", &self.size).finish()
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.state.in_use.fetch_sub(self.size, Ordering::AcqRel);
        self.state.live.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Zero-initialised, fixed-length buffer holding a sensor's latest input report
#[derive(Debug)]
pub struct ReportBuffer {
    bytes: Box<[u8]>,
    _lease: Lease,
}

impl ReportBuffer {
    /// Allocate exactly `size` zeroed bytes from `pool`
    pub fn allocate(pool: &MemoryPool, size: usize) -> AllocResult<Self> {
        if size == 0 {
            return Err(AllocError::ZeroSized);
        }

        let lease = pool.lease(size)?;

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| AllocError::OutOfMemory { requested: size, available: 0 })?;
        bytes.resize(size, 0);

        Ok(Self { bytes: bytes.into_boxed_slice(), _lease: lease })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}
