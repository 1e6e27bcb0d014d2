use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters tracking lifecycle outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Blobs successfully ingested.
    pub ingested: AtomicU64,
    /// Ingests that failed after validation.
    pub ingest_failed: AtomicU64,
    /// Blobs served by `resolve`.
    pub resolved: AtomicU64,
    /// Records retired by any path.
    pub retired: AtomicU64,
    /// Records retired because they expired (lazily or by sweep).
    pub expired: AtomicU64,
    /// Records retired by an authorized delete.
    pub deleted: AtomicU64,
    /// Delete attempts rejected for a wrong token.
    pub forbidden: AtomicU64,
    /// Completed expiry sweeps.
    pub sweeps: AtomicU64,
    /// Expired records whose retirement failed, lazily or during a sweep.
    pub retire_failed: AtomicU64,
}

impl EngineMetrics {
    pub fn increment_ingested(&self) {
        self.ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_ingest_failed(&self) {
        self.ingest_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_resolved(&self) {
        self.resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retired(&self) {
        self.retired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deleted(&self) {
        self.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_forbidden(&self) {
        self.forbidden.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sweeps(&self) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_retire_failed(&self) {
        self.retire_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ingested: self.ingested.load(Ordering::Relaxed),
            ingest_failed: self.ingest_failed.load(Ordering::Relaxed),
            resolved: self.resolved.load(Ordering::Relaxed),
            retired: self.retired.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            deleted: self.deleted.load(Ordering::Relaxed),
            forbidden: self.forbidden.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            retire_failed: self.retire_failed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub ingested: u64,
    pub ingest_failed: u64,
    pub resolved: u64,
    pub retired: u64,
    pub expired: u64,
    pub deleted: u64,
    pub forbidden: u64,
    pub sweeps: u64,
    pub retire_failed: u64,
}
