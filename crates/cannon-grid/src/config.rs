use std::time::Duration;

use crate::error::{CannonError, Result};

/// Environment variable overriding the discovered worker count.
pub const WORKERS_ENV: &str = "CANNON_WORKERS";
/// Environment variable selecting the origin rank.
pub const ORIGIN_ENV: &str = "CANNON_ORIGIN";
/// Environment variable setting a receive timeout in milliseconds.
pub const RECV_TIMEOUT_ENV: &str = "CANNON_RECV_TIMEOUT_MS";

/// Run configuration for the in-process engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannonConfig {
    /// Number of workers. Must be a perfect square for a distributed run;
    /// that check belongs to the run's validation verdict, not to
    /// `validate()`.
    pub workers: usize,
    /// Rank that owns the input matrices and receives the result.
    pub origin: usize,
    /// Give up on a receive after this long. `None` waits forever.
    pub recv_timeout: Option<Duration>,
}

impl CannonConfig {
    /// Configuration for `workers` workers with origin 0.
    pub fn with_workers(workers: usize) -> Self {
        CannonConfig {
            workers,
            ..Self::default()
        }
    }

    /// Read the configuration from the process environment.
    ///
    /// - `CANNON_WORKERS` -> workers (default: logical CPU count)
    /// - `CANNON_ORIGIN` -> origin (default 0)
    /// - `CANNON_RECV_TIMEOUT_MS` -> recv_timeout (default none)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CannonConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let workers = match lookup(WORKERS_ENV) {
            Some(v) => parse_var(WORKERS_ENV, &v)?,
            None => num_cpus::get(),
        };
        let origin = match lookup(ORIGIN_ENV) {
            Some(v) => parse_var(ORIGIN_ENV, &v)?,
            None => 0,
        };
        let recv_timeout = lookup(RECV_TIMEOUT_ENV)
            .map(|v| parse_var::<u64>(RECV_TIMEOUT_ENV, &v).map(Duration::from_millis))
            .transpose()?;

        let config = CannonConfig {
            workers,
            origin,
            recv_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(CannonError::InvalidConfig("workers must be >= 1".into()));
        }
        if self.origin >= self.workers {
            return Err(CannonError::InvalidConfig(format!(
                "origin {} >= workers {}",
                self.origin, self.workers
            )));
        }
        if self.recv_timeout == Some(Duration::ZERO) {
            return Err(CannonError::InvalidConfig(
                "recv_timeout must be > 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CannonConfig {
    fn default() -> Self {
        CannonConfig {
            workers: 1,
            origin: 0,
            recv_timeout: None,
        }
    }
}

fn parse_var<V: std::str::FromStr>(key: &str, value: &str) -> Result<V> {
    value.trim().parse().map_err(|_| {
        CannonError::InvalidConfig(format!("{}={:?} is not a non-negative integer", key, value))
    })
}
