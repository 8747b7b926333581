//! Sampled distribution backed by HdrHistogram.
//!
//! Writers call `update()`; the exporter calls `snapshot()` and formats the
//! copy, so a tick never reads a histogram that is still being written.
//!
//! Percentiles come from the HdrHistogram buckets. Count, min, max, mean and
//! stddev are tracked exactly next to it, since bucket-equivalent values can
//! lie outside the recorded range.

use hdrhistogram::Histogram as Hdr;
use parking_lot::Mutex;

use super::percentiles::{self, PercentileSet};

/// 3 significant figures, auto-resizing range.
const HIST_SIGFIG: u8 = 3;

fn new_hdr() -> Hdr<u64> {
    Hdr::<u64>::new(HIST_SIGFIG).expect("histogram creation")
}

// ─── Histogram ───────────────────────────────────────────────────

/// Thread-safe histogram of `i64` observations.
///
/// HdrHistogram only stores unsigned values, so negative observations count
/// as zero for percentiles. The exact min, max and mean keep the raw value.
pub struct Histogram {
    inner: Mutex<Inner>,
}

struct Inner {
    hdr: Hdr<u64>,
    count: i64,
    min: i64,
    max: i64,
    sum: i128,
    // Welford running mean and sum of squared deviations
    run_mean: f64,
    m2: f64,
}

impl Inner {
    fn new() -> Self {
        Self {
            hdr: new_hdr(),
            count: 0,
            min: 0,
            max: 0,
            sum: 0,
            run_mean: 0.0,
            m2: 0.0,
        }
    }

    fn record(&mut self, value: i64) {
        // Auto-resize only refuses values past u64 range; saturating keeps
        // the count in step with the exact fields instead of dropping one.
        self.hdr.saturating_record(value.max(0) as u64);

        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value as i128;

        let x = value as f64;
        let delta = x - self.run_mean;
        self.run_mean += delta / self.count as f64;
        self.m2 += delta * (x - self.run_mean);
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Record a single observation.
    pub fn update(&self, value: i64) {
        self.inner.lock().record(value);
    }

    pub fn clear(&self) {
        *self.inner.lock() = Inner::new();
    }

    pub fn count(&self) -> i64 {
        self.inner.lock().count
    }

    /// Immutable copy of the current distribution.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let inner = self.inner.lock();
        if inner.count == 0 {
            return HistogramSnapshot::empty(inner.hdr.clone());
        }

        let n = inner.count as f64;
        HistogramSnapshot {
            hist: inner.hdr.clone(),
            count: inner.count,
            min: inner.min,
            max: inner.max,
            mean: inner.sum as f64 / n,
            // population stddev
            std_dev: (inner.m2 / n).max(0.0).sqrt(),
        }
    }
}

impl std::fmt::Debug for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Histogram")
            .field("count", &self.count())
            .finish()
    }
}

// ─── HistogramSnapshot ───────────────────────────────────────────

/// Point-in-time copy of a `Histogram`. All accessors read the same sample
/// set. Every accessor returns zero on an empty snapshot.
#[derive(Clone)]
pub struct HistogramSnapshot {
    hist: Hdr<u64>,
    count: i64,
    min: i64,
    max: i64,
    mean: f64,
    std_dev: f64,
}

impl HistogramSnapshot {
    fn empty(hist: Hdr<u64>) -> Self {
        Self {
            hist,
            count: 0,
            min: 0,
            max: 0,
            mean: 0.0,
            std_dev: 0.0,
        }
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Values at arbitrary quantiles in `0.0..=1.0`.
    pub fn percentiles(&self, qs: &[f64]) -> Vec<f64> {
        percentiles::quantiles(&self.hist, qs)
    }

    /// Values at the fixed export quantiles.
    pub fn percentile_set(&self) -> PercentileSet {
        PercentileSet::from_histogram(&self.hist)
    }
}

impl std::fmt::Debug for HistogramSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistogramSnapshot")
            .field("count", &self.count)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("mean", &self.mean)
            .finish()
    }
}
