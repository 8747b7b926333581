use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use metrics_udpjson::{Counter, GaugeFloat, Histogram, Meter, Registry, RegistryError, Timer};

// ─── Demo metrics ────────────────────────────────────────────────

/// Handles to the metrics the synthetic workload drives.
#[derive(Clone)]
pub struct DemoMetrics {
    pub requests: Arc<Counter>,
    /// Requests currently being served; workers `inc`/`dec` it atomically.
    pub in_flight: Arc<Counter>,
    pub error_ratio: Arc<GaugeFloat>,
    pub payload_bytes: Arc<Histogram>,
    pub events: Arc<Meter>,
    pub handler: Arc<Timer>,
}

impl DemoMetrics {
    /// Create every demo metric and register it under its `demo.*` name.
    pub fn register(registry: &Registry) -> Result<Self, RegistryError> {
        let m = Self {
            requests: Arc::new(Counter::new()),
            in_flight: Arc::new(Counter::new()),
            error_ratio: Arc::new(GaugeFloat::new()),
            payload_bytes: Arc::new(Histogram::new()),
            events: Arc::new(Meter::new()),
            handler: Arc::new(Timer::new()),
        };

        registry.register("demo.requests", Arc::clone(&m.requests))?;
        registry.register("demo.in_flight", Arc::clone(&m.in_flight))?;
        registry.register("demo.error_ratio", Arc::clone(&m.error_ratio))?;
        registry.register("demo.payload_bytes", Arc::clone(&m.payload_bytes))?;
        registry.register("demo.events", Arc::clone(&m.events))?;
        registry.register("demo.handler", Arc::clone(&m.handler))?;
        Ok(m)
    }
}

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that simulate request handling until
/// the `running` flag is set to false. The returned handle completes once
/// every worker has stopped.
///
/// `live` is raised by `concurrency` before this returns and lowered as
/// each worker ends, including by panic.
pub fn spawn(
    running: Arc<AtomicBool>,
    metrics: DemoMetrics,
    concurrency: u32,
    live: Arc<AtomicUsize>,
) -> JoinHandle<()> {
    let mut handles = Vec::with_capacity(concurrency as usize);

    for worker_id in 0..concurrency {
        let running = running.clone();
        let metrics = metrics.clone();
        let guard = LiveGuard::enter(Arc::clone(&live));

        handles.push(tokio::spawn(async move {
            let _guard = guard;
            worker(worker_id, running, metrics).await;
        }));
    }

    tokio::spawn(async move {
        for h in handles {
            let _ = h.await;
        }
    })
}

/// One unit of `live`, given back on drop.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn enter(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(id: u32, running: Arc<AtomicBool>, metrics: DemoMetrics) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);
    let mut served: u64 = 0;
    let mut failed: u64 = 0;

    while running.load(Ordering::Relaxed) {
        metrics.in_flight.inc(1);
        let started = std::time::Instant::now();

        // 1–20 ms of simulated work
        let work_ms = rng.gen_range(1..=20u64);
        tokio::time::sleep(Duration::from_millis(work_ms)).await;

        metrics.handler.update_since(started);
        metrics.requests.inc(1);
        metrics.events.mark(rng.gen_range(1..=5));
        metrics.payload_bytes.update(rng.gen_range(64..=16_384));
        metrics.in_flight.dec(1);

        served += 1;
        if rng.gen_bool(0.02) {
            failed += 1;
        }
        metrics.error_ratio.update(failed as f64 / served as f64);
    }
}
