//! Periodic JSON metrics export over UDP or TCP.
//!
//! A [`Registry`] holds named metrics; an [`Exporter`] wakes up every
//! interval, snapshots each metric, and writes one JSON object per metric
//! to its [`Transport`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use metrics_udpjson::{Connection, Counter, Exporter, ExporterConfig, Protocol, Registry};
//!
//! # async fn demo() -> std::io::Result<()> {
//! let registry = Arc::new(Registry::new());
//! let requests = Arc::new(Counter::new());
//! registry.register("requests", Arc::clone(&requests)).unwrap();
//!
//! let conn = Connection::connect(Protocol::Udp, "127.0.0.1:8125").await?;
//! let config = ExporterConfig::new(Duration::from_secs(10)).with_server_id(7);
//! let handle = Exporter::new(registry, conn, config).spawn(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! });
//!
//! requests.inc(1);
//! # let _ = handle;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod metrics;

pub use config::{Config, ExporterConfig, Protocol};
pub use error::{ConfigError, ExportError, RegistryError};
pub use export::{
    records_for_tick, Connection, ExportStats, Exporter, JsonTime, Payload, Record, TickSummary,
    Transport, TypeTag,
};
pub use metrics::{
    Counter, Gauge, GaugeFloat, Healthcheck, Histogram, Meter, Metric, MetricKind, Registry, Timer,
};
