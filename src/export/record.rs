//! Wire records: one flat JSON object per metric per tick.
//!
//! Shared keys come first (`time`, optional `server_id`, `type`, `metric`),
//! followed by the kind-specific payload keys.

use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::metrics::{HistogramSnapshot, MeterSnapshot, Metric};

/// Text written to the `string` field of a passing health check.
pub const HEALTHY: &str = "<nil>";

// ─── Time ────────────────────────────────────────────────────────

/// Capture time rendered as RFC3339 with second precision, UTC (`...Z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonTime(DateTime<Utc>);

impl JsonTime {
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for JsonTime {
    /// Sub-second precision is dropped; the wire format cannot carry it.
    fn from(t: DateTime<Utc>) -> Self {
        Self(t.trunc_subsecs(0))
    }
}

impl fmt::Display for JsonTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl Serialize for JsonTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|t| Self::from(t.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}

// ─── Type tag ────────────────────────────────────────────────────

/// Value of the `type` key. Float gauges and health checks use `gauge`,
/// timers use `histogram`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Counter,
    Gauge,
    Histogram,
    Meter,
}

// ─── Payloads ────────────────────────────────────────────────────

/// Distribution summary shared by histograms and timers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub count: i64,
    #[serde(rename = "minimum")]
    pub min: i64,
    #[serde(rename = "maximum")]
    pub max: i64,
    pub mean: f64,
    pub stddev: f64,
    pub pct50: f64,
    pub pct75: f64,
    pub pct95: f64,
    pub pct99: f64,
    /// Value at the 0.999 quantile.
    pub pct9999: f64,
}

impl From<&HistogramSnapshot> for Distribution {
    fn from(s: &HistogramSnapshot) -> Self {
        let ps = s.percentile_set();
        Self {
            count: s.count(),
            min: s.min(),
            max: s.max(),
            mean: s.mean(),
            stddev: s.std_dev(),
            pct50: ps.p50,
            pct75: ps.p75,
            pct95: ps.p95,
            pct99: ps.p99,
            pct9999: ps.p999,
        }
    }
}

/// Moving-average rates shared by meters and timers, events per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    pub rate1m: f64,
    pub rate5m: f64,
    pub rate15m: f64,
    pub ratemean: f64,
}

impl From<&MeterSnapshot> for Rates {
    fn from(s: &MeterSnapshot) -> Self {
        Self {
            rate1m: s.rate1,
            rate5m: s.rate5,
            rate15m: s.rate15,
            ratemean: s.rate_mean,
        }
    }
}

/// Kind-specific keys. Variant order matters when decoding: the first
/// variant whose keys are all present wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Timer {
        #[serde(flatten)]
        distribution: Distribution,
        #[serde(flatten)]
        rates: Rates,
    },
    Histogram(Distribution),
    Meter {
        count: i64,
        #[serde(flatten)]
        rates: Rates,
    },
    Healthcheck {
        #[serde(rename = "string")]
        error: String,
    },
    Int {
        value: i64,
    },
    Float {
        #[serde(serialize_with = "finite")]
        value: f64,
    },
}

/// JSON has no NaN or infinity; serde_json would write `null`, which no
/// consumer can decode as a gauge. Fail instead so the record is dropped.
fn finite<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !v.is_finite() {
        return Err(S::Error::custom(format_args!("non-finite gauge value {v}")));
    }
    serializer.serialize_f64(*v)
}

// ─── Record ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub time: JsonTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: TypeTag,
    pub metric: String,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Record {
    /// Build the record for one metric.
    ///
    /// Histograms, meters and timers are snapshotted first. Health checks
    /// have their check function run here, once per call.
    pub fn from_metric(name: &str, metric: &Metric, time: JsonTime, server_id: Option<i64>) -> Self {
        let (kind, payload) = match metric {
            Metric::Counter(c) => (TypeTag::Counter, Payload::Int { value: c.count() }),
            Metric::Gauge(g) => (TypeTag::Gauge, Payload::Int { value: g.value() }),
            Metric::GaugeFloat(g) => (TypeTag::Gauge, Payload::Float { value: g.value() }),
            Metric::Healthcheck(h) => {
                h.check();
                let error = h.error().unwrap_or_else(|| HEALTHY.to_owned());
                (TypeTag::Gauge, Payload::Healthcheck { error })
            }
            Metric::Histogram(h) => {
                let s = h.snapshot();
                (TypeTag::Histogram, Payload::Histogram(Distribution::from(&s)))
            }
            Metric::Meter(m) => {
                let s = m.snapshot();
                let payload = Payload::Meter {
                    count: s.count,
                    rates: Rates::from(&s),
                };
                (TypeTag::Meter, payload)
            }
            Metric::Timer(t) => {
                let s = t.snapshot();
                let payload = Payload::Timer {
                    distribution: Distribution::from(&s.histogram),
                    rates: Rates::from(&s.meter),
                };
                (TypeTag::Histogram, payload)
            }
        };

        Self {
            time,
            server_id,
            kind,
            metric: name.to_owned(),
            payload,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
