//! Audit timestamp interception.
//!
//! # Invariants
//! - Inserts get `created_at == updated_at`.
//! - Updates (single-row and bulk) refresh `updated_at` only.

use crate::model::audit::AuditStamp;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond wall clock.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// Settable clock for deterministic timestamps. Clones share one instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Hook the executor calls around writes.
pub trait AuditInterceptor {
    fn on_create(&self, stamp: &mut AuditStamp);
    fn on_update(&self, stamp: &mut AuditStamp);
    /// `updated_at` value bound into bulk updates.
    fn bulk_update_stamp(&self) -> i64;
}

/// Stamps records from a [`Clock`].
#[derive(Clone)]
pub struct TimestampAuditor {
    clock: Arc<dyn Clock>,
}

impl TimestampAuditor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for TimestampAuditor {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl AuditInterceptor for TimestampAuditor {
    fn on_create(&self, stamp: &mut AuditStamp) {
        let now = self.clock.now_ms();
        stamp.created_at = now;
        stamp.updated_at = now;
    }

    fn on_update(&self, stamp: &mut AuditStamp) {
        stamp.updated_at = self.clock.now_ms();
    }

    fn bulk_update_stamp(&self) -> i64 {
        self.clock.now_ms()
    }
}
