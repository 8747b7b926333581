//! In-process metric types and the registry the exporter reads from.

pub mod counter;
pub mod gauge;
pub mod healthcheck;
pub mod histogram;
pub mod meter;
pub mod percentiles;
pub mod registry;
pub mod timer;

use std::sync::Arc;

pub use counter::Counter;
pub use gauge::{Gauge, GaugeFloat};
pub use healthcheck::Healthcheck;
pub use histogram::{Histogram, HistogramSnapshot};
pub use meter::{Meter, MeterSnapshot};
pub use percentiles::{PercentileSet, QUANTILES};
pub use registry::Registry;
pub use timer::{Timer, TimerSnapshot};

/// A registered metric. The variant, not the registration name, decides
/// how the metric is exported.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    GaugeFloat(Arc<GaugeFloat>),
    Healthcheck(Arc<Healthcheck>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
}

/// Discriminant of `Metric`, handy for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    GaugeFloat,
    Healthcheck,
    Histogram,
    Meter,
    Timer,
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Gauge(_) => MetricKind::Gauge,
            Self::GaugeFloat(_) => MetricKind::GaugeFloat,
            Self::Healthcheck(_) => MetricKind::Healthcheck,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Meter(_) => MetricKind::Meter,
            Self::Timer(_) => MetricKind::Timer,
        }
    }
}

macro_rules! impl_from_arc {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<Arc<$variant>> for Metric {
                fn from(m: Arc<$variant>) -> Self {
                    Self::$variant(m)
                }
            }

            impl From<$variant> for Metric {
                fn from(m: $variant) -> Self {
                    Self::$variant(Arc::new(m))
                }
            }
        )*
    };
}

impl_from_arc!(Counter, Gauge, GaugeFloat, Healthcheck, Histogram, Meter, Timer);
