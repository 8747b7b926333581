use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Exporter-side counters. Failed records are otherwise invisible, so this
/// is the place to look when a collector goes quiet.
#[derive(Debug, Default)]
pub struct ExportStats {
    ticks: AtomicU64,
    records_written: AtomicU64,
    write_failures: AtomicU64,
    serialize_failures: AtomicU64,
}

/// Plain copy of `ExportStats`, e.g. for logging as JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportStatsSnapshot {
    pub ticks: u64,
    pub records_written: u64,
    pub write_failures: u64,
    pub serialize_failures: u64,
}

impl ExportStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_serialize_failure(&self) {
        self.serialize_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    /// Records lost because the transport rejected the write.
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    pub fn serialize_failures(&self) -> u64 {
        self.serialize_failures.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ExportStatsSnapshot {
        ExportStatsSnapshot {
            ticks: self.ticks(),
            records_written: self.records_written(),
            write_failures: self.write_failures(),
            serialize_failures: self.serialize_failures(),
        }
    }
}
