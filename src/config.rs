use std::env;
use std::time::{Duration, Instant};

use crate::error::ConfigError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
/// Wishes live for 72 hours unless burned first.
pub const DEFAULT_WISH_TTL: Duration = Duration::from_secs(72 * 3600);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Server settings, read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub wish_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            wish_ttl: DEFAULT_WISH_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl Config {
    /// Reads `HOST`, `PORT`, `WISH_TTL_SECS` and `SWEEP_INTERVAL_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as [`Config::from_env`] but with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = parse_var("PORT", port)?;
        }
        if let Some(secs) = lookup("WISH_TTL_SECS") {
            let ttl = Duration::from_secs(parse_var("WISH_TTL_SECS", secs.clone())?);
            // deadlines are computed as now + ttl
            if Instant::now().checked_add(ttl).is_none() {
                return Err(ConfigError::Invalid {
                    var: "WISH_TTL_SECS",
                    value: secs,
                });
            }
            config.wish_ttl = ttl;
        }
        if let Some(secs) = lookup("SWEEP_INTERVAL_SECS") {
            let secs: u64 = parse_var("SWEEP_INTERVAL_SECS", secs)?;
            // a zero interval would spin the sweeper
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var: "SWEEP_INTERVAL_SECS",
                    value: secs.to_string(),
                });
            }
            config.sweep_interval = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}
