use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::histogram::{Histogram, HistogramSnapshot};
use super::meter::{Meter, MeterSnapshot};

/// Duration distribution plus event rate. Every `update()` records the
/// duration in nanoseconds and marks one event.
#[derive(Debug, Default)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
    // held across both halves in `update` and `snapshot`
    pair: Mutex<()>,
}

/// Point-in-time copy of a `Timer`. Both halves are copied while holding
/// the timer's lock, so `histogram.count()` equals `meter.count`.
#[derive(Debug, Clone)]
pub struct TimerSnapshot {
    pub histogram: HistogramSnapshot,
    pub meter: MeterSnapshot,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, d: Duration) {
        let ns = i64::try_from(d.as_nanos()).unwrap_or(i64::MAX);
        let _pair = self.pair.lock();
        self.histogram.update(ns);
        self.meter.mark(1);
    }

    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    /// Run `f`, record how long it took, and return its result.
    pub fn time<R>(&self, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let out = f();
        self.update_since(start);
        out
    }

    pub fn count(&self) -> i64 {
        self.histogram.count()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let _pair = self.pair.lock();
        TimerSnapshot {
            histogram: self.histogram.snapshot(),
            meter: self.meter.snapshot(),
        }
    }
}
