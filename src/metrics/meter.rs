//! Event-rate meter with 1/5/15-minute exponentially weighted moving
//! averages.
//!
//! The averages advance in whole 5-second ticks. Ticks are applied lazily
//! from elapsed wall time on every `mark()` and `snapshot()`, so no
//! background task is needed.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Length of one EWMA tick.
const TICK_INTERVAL: Duration = Duration::from_secs(5);

// ─── EWMA ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Ewma {
    alpha: f64,
    /// Events per second.
    rate: f64,
    init: bool,
}

impl Ewma {
    fn with_minutes(minutes: f64) -> Self {
        let tick = TICK_INTERVAL.as_secs_f64();
        Self {
            alpha: 1.0 - (-tick / 60.0 / minutes).exp(),
            rate: 0.0,
            init: false,
        }
    }

    /// Fold `uncounted` events from the last tick into the average.
    fn tick(&mut self, uncounted: i64) {
        let instant_rate = uncounted as f64 / TICK_INTERVAL.as_secs_f64();
        if self.init {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.init = true;
        }
    }
}

// ─── Meter ───────────────────────────────────────────────────────

/// Thread-safe event meter. Hosts call `mark()`, the exporter calls
/// `snapshot()`.
pub struct Meter {
    inner: Mutex<MeterState>,
}

struct MeterState {
    count: i64,
    uncounted: i64,
    /// 1m, 5m, 15m
    ewmas: [Ewma; 3],
    start: Instant,
    last_tick: Instant,
}

/// Point-in-time copy of a `Meter`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(start: Instant) -> Self {
        Self {
            inner: Mutex::new(MeterState {
                count: 0,
                uncounted: 0,
                ewmas: [
                    Ewma::with_minutes(1.0),
                    Ewma::with_minutes(5.0),
                    Ewma::with_minutes(15.0),
                ],
                start,
                last_tick: start,
            }),
        }
    }

    /// Record `n` events.
    pub fn mark(&self, n: i64) {
        self.mark_at(n, Instant::now());
    }

    pub fn count(&self) -> i64 {
        self.inner.lock().count
    }

    pub fn snapshot(&self) -> MeterSnapshot {
        self.snapshot_at(Instant::now())
    }

    fn mark_at(&self, n: i64, now: Instant) {
        let mut state = self.inner.lock();
        state.tick_to(now);
        state.count += n;
        state.uncounted += n;
    }

    fn snapshot_at(&self, now: Instant) -> MeterSnapshot {
        let mut state = self.inner.lock();
        state.tick_to(now);

        let elapsed = now.saturating_duration_since(state.start).as_secs_f64();
        let rate_mean = if elapsed > 0.0 {
            state.count as f64 / elapsed
        } else {
            0.0
        };

        MeterSnapshot {
            count: state.count,
            rate1: state.ewmas[0].rate,
            rate5: state.ewmas[1].rate,
            rate15: state.ewmas[2].rate,
            rate_mean,
        }
    }
}

impl MeterState {
    /// Apply every whole tick that has elapsed since `last_tick`. Pending
    /// events belong to the first of those ticks.
    fn tick_to(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let ticks = elapsed.as_nanos() / TICK_INTERVAL.as_nanos();

        for _ in 0..ticks {
            let uncounted = std::mem::take(&mut self.uncounted);
            for ewma in self.ewmas.iter_mut() {
                ewma.tick(uncounted);
            }
            self.last_tick += TICK_INTERVAL;
        }
    }
}

impl std::fmt::Debug for Meter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Meter").field("count", &self.count()).finish()
    }
}
