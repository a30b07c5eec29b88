use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::{aggfuncs::{AggError, AggResult, MemDelta}, executor::{ExecutorConfig, OnExceed}};

/// Per-query memory counter shared by all workers of an aggregation.
///
/// Workers add the deltas reported by aggregate functions; crossing the quota
/// applies the configured [`OnExceed`] policy.
#[derive(Debug, Default)]
pub struct MemQuota {
    consumed: AtomicI64,
    quota: Option<i64>,
    on_exceed: OnExceed,
    warned: AtomicBool,
}

impl MemQuota {
    pub fn new(quota: Option<i64>, on_exceed: OnExceed) -> Self {
        Self { consumed: AtomicI64::new(0), quota, on_exceed, warned: AtomicBool::new(false) }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(config.mem_quota, config.on_exceed)
    }

    pub fn unlimited() -> Self {
        Self::new(None, OnExceed::Cancel)
    }

    pub fn consumed(&self) -> i64 {
        self.consumed.load(Ordering::Relaxed)
    }

    /// Add `delta` (may be negative) and check the quota.
    pub fn consume(&self, delta: MemDelta) -> AggResult<()> {
        let consumed = self.consumed.fetch_add(delta, Ordering::AcqRel) + delta;
        let Some(quota) = self.quota else { return Ok(()) };
        if delta <= 0 || consumed <= quota {
            return Ok(());
        }
        match self.on_exceed {
            OnExceed::Cancel => {
                tracing::error!(consumed, quota, "aggregate memory quota exceeded");
                Err(AggError::ResourceExhausted { consumed, quota })
            }
            OnExceed::LogOnly => {
                if !self.warned.swap(true, Ordering::Relaxed) {
                    tracing::warn!(consumed, quota, "aggregate memory quota exceeded, continuing");
                }
                Ok(())
            }
        }
    }

    /// Give back bytes that are no longer held.
    pub fn release(&self, bytes: i64) {
        self.consumed.fetch_sub(bytes, Ordering::AcqRel);
    }
}
