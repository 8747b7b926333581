use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_ADDR: &str = "127.0.0.1:8125";

// ─── Exporter ────────────────────────────────────────────────────

/// Settings for one export loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    /// Time between passes.
    pub interval: Duration,
    /// Written as `server_id` on every record when set, to tell several
    /// processes feeding one collector apart.
    pub server_id: Option<i64>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            server_id: None,
        }
    }
}

impl ExporterConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            server_id: None,
        }
    }

    pub fn with_server_id(mut self, id: i64) -> Self {
        self.server_id = Some(id);
        self
    }
}

// ─── Protocol ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            _ => Err("must be 'udp' or 'tcp'".into()),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("udp"),
            Self::Tcp => f.write_str("tcp"),
        }
    }
}

// ─── Process config ──────────────────────────────────────────────

/// Everything the binary needs: where to send and how often.
///
/// | Variable              | Default          |
/// |-----------------------|------------------|
/// | `UDPJSON_ADDR`        | `127.0.0.1:8125` |
/// | `UDPJSON_PROTOCOL`    | `udp`            |
/// | `UDPJSON_INTERVAL_MS` | `10000`          |
/// | `UDPJSON_SERVER_ID`   | unset            |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub addr: String,
    pub protocol: Protocol,
    pub exporter: ExporterConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("UDPJSON_ADDR").unwrap_or_else(|| DEFAULT_ADDR.into());

        let protocol = match lookup("UDPJSON_PROTOCOL") {
            Some(v) => v
                .parse::<Protocol>()
                .map_err(|reason| invalid("UDPJSON_PROTOCOL", &v, reason))?,
            None => Protocol::default(),
        };

        let interval = match lookup("UDPJSON_INTERVAL_MS") {
            Some(v) => {
                let ms: u64 = v
                    .parse()
                    .map_err(|e: std::num::ParseIntError| invalid("UDPJSON_INTERVAL_MS", &v, e.to_string()))?;
                if ms == 0 {
                    return Err(invalid("UDPJSON_INTERVAL_MS", &v, "must be greater than zero".into()));
                }
                Duration::from_millis(ms)
            }
            None => DEFAULT_INTERVAL,
        };

        let server_id = lookup("UDPJSON_SERVER_ID")
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|e| invalid("UDPJSON_SERVER_ID", &v, e.to_string()))
            })
            .transpose()?;

        Ok(Self {
            addr,
            protocol,
            exporter: ExporterConfig { interval, server_id },
        })
    }
}

fn invalid(var: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_owned(),
        reason,
    }
}
