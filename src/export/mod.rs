//! The export loop: every interval, turn each registered metric into one
//! JSON record and write it to the transport.
//!
//! Delivery is best effort. A record that fails to serialize or write is
//! counted in [`ExportStats`] and dropped; the loop itself never stops on
//! an error.

pub mod record;
pub mod stats;
pub mod transport;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::config::ExporterConfig;
use crate::error::ExportError;
use crate::metrics::Registry;

pub use record::{JsonTime, Payload, Record, TypeTag, HEALTHY};
pub use stats::{ExportStats, ExportStatsSnapshot};
pub use transport::{Connection, Transport};

/// Shortest interval the loop will run at; `tokio::time::interval`
/// rejects zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Outcome of a single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSummary {
    pub records: usize,
    pub written: usize,
    pub failed: usize,
}

/// Build one record per registered metric, all stamped with `now`.
pub fn records_for_tick(registry: &Registry, now: JsonTime, server_id: Option<i64>) -> Vec<Record> {
    let mut records = Vec::with_capacity(registry.len());
    registry.each(|name, metric| {
        records.push(Record::from_metric(name, metric, now, server_id));
    });
    records
}

// ─── Exporter ────────────────────────────────────────────────────

pub struct Exporter<T: Transport> {
    registry: Arc<Registry>,
    transport: T,
    config: ExporterConfig,
    stats: Arc<ExportStats>,
}

impl<T: Transport> Exporter<T> {
    pub fn new(registry: Arc<Registry>, transport: T, config: ExporterConfig) -> Self {
        Self {
            registry,
            transport,
            config,
            stats: Arc::new(ExportStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<ExportStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// Give the transport back, e.g. to inspect what was written.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Export every registered metric once, right now.
    pub async fn tick(&mut self) -> TickSummary {
        let now = JsonTime::now();
        let records = records_for_tick(&self.registry, now, self.config.server_id);

        let mut summary = TickSummary {
            records: records.len(),
            ..TickSummary::default()
        };

        for record in &records {
            match self.send(record).await {
                Ok(()) => {
                    self.stats.record_written();
                    summary.written += 1;
                }
                Err(e) => {
                    match e {
                        ExportError::Serialize(_) => self.stats.record_serialize_failure(),
                        ExportError::Write(_) => self.stats.record_write_failure(),
                    }
                    tracing::debug!(metric = %record.metric, error = %e, "dropped metric record");
                    summary.failed += 1;
                }
            }
        }

        self.stats.record_tick();
        tracing::trace!(
            time = %now,
            records = summary.records,
            failed = summary.failed,
            "export tick complete"
        );
        summary
    }

    async fn send(&mut self, record: &Record) -> Result<(), ExportError> {
        let bytes = record.to_json()?;
        self.transport.write_record(&bytes).await?;
        Ok(())
    }

    /// Tick once per interval until `shutdown` resolves. The first pass
    /// happens one full interval after the call; a slow pass delays the
    /// following ones instead of bunching them up.
    pub async fn run_until<S>(mut self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let period = self.config.interval.max(MIN_INTERVAL);
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        tracing::info!(
            interval_ms = period.as_millis() as u64,
            server_id = ?self.config.server_id,
            "metrics exporter started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                Some(_) = ticks.next() => {
                    self.tick().await;
                }
                else => break,
            }
        }

        tracing::info!(
            ticks = self.stats.ticks(),
            write_failures = self.stats.write_failures(),
            "metrics exporter stopped"
        );
    }

    /// Tick forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }
}

impl<T: Transport + 'static> Exporter<T> {
    /// Run the loop on its own task.
    pub fn spawn<S>(self, shutdown: S) -> JoinHandle<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(self.run_until(shutdown))
    }
}
