// src/core/services/slot.rs
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::types::RenderRecord;

/// Single-slot admission guard: at most one inference job per source.
#[derive(Debug, Default)]
pub struct JobSlot {
    busy: AtomicBool,
}

impl JobSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claims the slot. The slot frees itself when the permit is dropped,
    /// including when the job holding it panics.
    pub fn try_acquire(self: &Arc<Self>) -> Option<JobPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| JobPermit {
                slot: Arc::clone(self),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct JobPermit {
    slot: Arc<JobSlot>,
}

impl Drop for JobPermit {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
struct Published {
    epoch: u64,
    records: Arc<[RenderRecord]>,
}

/// Latest completed result set of a source, replaced wholesale.
///
/// Every `clear` starts a new epoch; results computed for an older epoch are
/// refused by `publish`.
#[derive(Debug)]
pub struct ResultSlot {
    inner: RwLock<Published>,
}

impl ResultSlot {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Published {
                epoch: 0,
                records: Arc::from(Vec::new()),
            }),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    pub fn latest(&self) -> Arc<[RenderRecord]> {
        Arc::clone(&self.inner.read().records)
    }

    /// Returns whether the records were accepted.
    pub fn publish(&self, epoch: u64, records: Vec<RenderRecord>) -> bool {
        let mut inner = self.inner.write();
        if inner.epoch != epoch {
            return false;
        }
        inner.records = Arc::from(records);
        true
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.epoch += 1;
        inner.records = Arc::from(Vec::new());
    }
}

impl Default for ResultSlot {
    fn default() -> Self {
        Self::new()
    }
}
