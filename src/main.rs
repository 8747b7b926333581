use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use metrics_udpjson::{Config, Connection, Exporter, Healthcheck, Registry};

mod load_generator;

const WORKERS: u32 = 4;
const DEFAULT_LOG_FILTER: &str = "metrics_udpjson=info";

/// `RUST_LOG` when it is set and parses, otherwise `DEFAULT_LOG_FILTER`.
fn log_filter<E>(from_env: Result<EnvFilter, E>) -> EnvFilter {
    from_env.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(EnvFilter::try_from_default_env()))
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   📡  UDP/JSON METRICS EXPORTER                  ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    // ── 1. Configuration ─────────────────────────────────────────
    let config = Config::from_env()?;
    tracing::info!(
        addr = %config.addr,
        protocol = %config.protocol,
        interval_ms = config.exporter.interval.as_millis() as u64,
        server_id = ?config.exporter.server_id,
        "configuration loaded"
    );

    // ── 2. Registry & demo metrics ───────────────────────────────
    let registry = Arc::new(Registry::new());
    let demo = load_generator::DemoMetrics::register(&registry)?;

    let running = Arc::new(AtomicBool::new(true));
    let live = Arc::new(AtomicUsize::new(0));
    let workers = Arc::clone(&live);
    registry.register(
        "demo.load_generator",
        Healthcheck::new(move || match workers.load(Ordering::SeqCst) {
            0 => Err("no load generator workers running".to_owned()),
            n if n < WORKERS as usize => Err(format!("{n} of {WORKERS} workers running")),
            _ => Ok(()),
        }),
    )?;

    // ── 3. Connect to the collector ──────────────────────────────
    let conn = Connection::connect(config.protocol, &config.addr).await?;
    tracing::info!(addr = %config.addr, "connected to collector");

    // ── 4. Start the synthetic workload ──────────────────────────
    let load = load_generator::spawn(Arc::clone(&running), demo, WORKERS, live);

    // ── 5. Export until Ctrl-C ───────────────────────────────────
    let exporter = Exporter::new(Arc::clone(&registry), conn, config.exporter);
    let stats = exporter.stats();
    let handle = exporter.spawn(async {
        let _ = tokio::signal::ctrl_c().await;
    });

    handle.await?;
    running.store(false, Ordering::SeqCst);
    let _ = load.await;

    let stats = stats.snapshot();
    tracing::info!(
        stats = %serde_json::to_string(&stats).unwrap_or_default(),
        "shutdown complete"
    );
    Ok(())
}
