use hdrhistogram::Histogram;
use serde::Serialize;

/// Quantiles reported for every histogram and timer.
pub const QUANTILES: [f64; 5] = [0.5, 0.75, 0.95, 0.99, 0.999];

/// The fixed percentile breakdown for one distribution snapshot.
/// Field order follows `QUANTILES`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileSet {
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub p99: f64,
    pub p999: f64,
}

impl PercentileSet {
    /// Extract the fixed set from an HdrHistogram.
    /// Returns zeroed values if the histogram is empty.
    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.len() == 0 {
            return Self::empty();
        }

        let ps = quantiles(hist, &QUANTILES);
        Self {
            p50: ps[0],
            p75: ps[1],
            p95: ps[2],
            p99: ps[3],
            p999: ps[4],
        }
    }

    /// All-zero placeholder used before any samples are recorded.
    pub fn empty() -> Self {
        Self {
            p50: 0.0,
            p75: 0.0,
            p95: 0.0,
            p99: 0.0,
            p999: 0.0,
        }
    }
}

/// Value at each requested quantile (0.0..=1.0). Empty histograms yield zeros.
pub fn quantiles(hist: &Histogram<u64>, qs: &[f64]) -> Vec<f64> {
    if hist.len() == 0 {
        return vec![0.0; qs.len()];
    }
    qs.iter()
        .map(|&q| hist.value_at_quantile(q) as f64)
        .collect()
}
