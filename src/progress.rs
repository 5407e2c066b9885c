//! Passive progress observation.
//!
//! Workers count the records they consume and periodically publish the
//! count into a shared [`ProgressCounter`], which forwards the running total
//! to the caller's [`Progress`] observer. Nothing here feeds back into the
//! aggregation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Receives the number of records consumed so far.
///
/// Called from worker threads in parallel mode, hence `Sync`.
pub trait Progress: Sync {
    fn on_progress(&self, records: u64);
}

impl<F> Progress for F
where
    F: Fn(u64) + Sync,
{
    fn on_progress(&self, records: u64) {
        self(records)
    }
}

pub struct NoProgress;

impl Progress for NoProgress {
    fn on_progress(&self, _records: u64) {}
}

pub struct ProgressCounter<'a> {
    total: AtomicU64,
    observer: &'a dyn Progress,
}

impl<'a> ProgressCounter<'a> {
    pub fn new(observer: &'a dyn Progress) -> Self {
        Self {
            total: AtomicU64::new(0),
            observer,
        }
    }

    pub fn add(&self, records: u64) {
        if records == 0 {
            return;
        }
        let total = self.total.fetch_add(records, Ordering::Relaxed) + records;
        self.observer.on_progress(total);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}
