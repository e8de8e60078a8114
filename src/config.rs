use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::policy::PolicyConfig;

/// Environment-driven configuration for the demo server binary. The library
/// itself takes a [`crate::Policy`] directly and reads no environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (`BIND_ADDR`, default `127.0.0.1:3000`).
    pub bind_addr: SocketAddr,
    /// Rate limit, either `RATE_LIMIT` shorthand or the explicit
    /// `RATE_CAPACITY` / `RATE_REFILL_RATE` / `RATE_REFILL_PERIOD_SECS`
    /// triple. Defaults to `100/minute` when none are set.
    pub policy: PolicyConfig,
    /// Idle-bucket sweep interval in seconds (`SWEEP_INTERVAL`, default 300).
    pub sweep_interval: Duration,
    /// Trust `x-forwarded-for`/`x-real-ip` over the socket address
    /// (`TRUST_FORWARDED`, default false).
    pub trust_forwarded: bool,
    /// Log level for the crate's tracing filter (`LOG_LEVEL`, default `info`).
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("BIND_ADDR", "127.0.0.1:3000")
            .parse()
            .context("invalid BIND_ADDR")?;

        let mut policy = PolicyConfig {
            rate: env::var("RATE_LIMIT").ok(),
            capacity: parse_env("RATE_CAPACITY")?,
            refill_rate: parse_env("RATE_REFILL_RATE")?,
            refill_period_secs: parse_env("RATE_REFILL_PERIOD_SECS")?,
        };
        if policy.rate.is_none()
            && policy.capacity.is_none()
            && policy.refill_rate.is_none()
            && policy.refill_period_secs.is_none()
        {
            policy = PolicyConfig::shorthand("100/minute");
        }

        let sweep_interval = Duration::from_secs(
            env_or("SWEEP_INTERVAL", "300")
                .parse()
                .context("invalid SWEEP_INTERVAL")?,
        );

        let trust_forwarded = env_or("TRUST_FORWARDED", "false")
            .parse()
            .context("invalid TRUST_FORWARDED")?;

        Ok(Self {
            bind_addr,
            policy,
            sweep_interval,
            trust_forwarded,
            log_level: env_or("LOG_LEVEL", "info"),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env(name: &str) -> Result<Option<f64>> {
    match env::var(name) {
        Ok(value) => {
            let parsed = value
                .parse()
                .with_context(|| format!("invalid {name}: {value:?}"))?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}
