use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Immutable limits shared by every bucket created under one limiter instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Policy {
    capacity: f64,
    refill_rate: f64,
    refill_period: Duration,
}

impl Policy {
    /// Explicit numeric form: burst capacity may differ from the nominal
    /// refill rate (e.g. a generous burst with a slow steady rate).
    pub fn new(
        capacity: f64,
        refill_rate: f64,
        refill_period_secs: f64,
    ) -> Result<Self, ConfigError> {
        ensure_positive("capacity", capacity)?;
        ensure_positive("refill_rate", refill_rate)?;
        ensure_positive("refill_period_secs", refill_period_secs)?;

        Ok(Self {
            capacity,
            refill_rate,
            refill_period: Duration::from_secs_f64(refill_period_secs),
        })
    }

    /// Shorthand form `"<N>/<period>"`, e.g. `"10/minute"`.
    ///
    /// Shorthand always means "N requests burst capacity, refilling at N per
    /// period": full capacity returns exactly once per period.
    pub fn parse(shorthand: &str) -> Result<Self, ConfigError> {
        let (count, period) = shorthand
            .split_once('/')
            .ok_or_else(|| ConfigError::MalformedShorthand(shorthand.to_string()))?;

        let count: f64 = count
            .trim()
            .parse()
            .map_err(|_| ConfigError::MalformedShorthand(shorthand.to_string()))?;

        let period_secs = match period.trim() {
            "second" => 1.0,
            "minute" => 60.0,
            "hour" => 3600.0,
            "day" => 86400.0,
            other => return Err(ConfigError::UnknownPeriod(other.to_string())),
        };

        Self::new(count, count, period_secs)
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    pub fn refill_period(&self) -> Duration {
        self.refill_period
    }

    /// Seconds until at least one more token accrues. A flat "wait this long
    /// and try again", independent of the current fractional deficit.
    pub fn retry_after_secs(&self) -> u64 {
        (self.refill_period.as_secs_f64() / self.refill_rate).ceil() as u64
    }
}

fn ensure_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

/// The two construction forms as they arrive from configuration, before
/// validation. Exactly one form must be present; [`PolicyConfig::build`]
/// rejects everything else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Shorthand form, e.g. `"100/hour"`.
    #[serde(default)]
    pub rate: Option<String>,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub refill_rate: Option<f64>,
    #[serde(default)]
    pub refill_period_secs: Option<f64>,
}

impl PolicyConfig {
    pub fn shorthand(rate: impl Into<String>) -> Self {
        Self {
            rate: Some(rate.into()),
            ..Self::default()
        }
    }

    pub fn explicit(capacity: f64, refill_rate: f64, refill_period_secs: f64) -> Self {
        Self {
            rate: None,
            capacity: Some(capacity),
            refill_rate: Some(refill_rate),
            refill_period_secs: Some(refill_period_secs),
        }
    }

    pub fn build(&self) -> Result<Policy, ConfigError> {
        let explicit = self.capacity.is_some()
            || self.refill_rate.is_some()
            || self.refill_period_secs.is_some();

        match (&self.rate, explicit) {
            (Some(_), true) => Err(ConfigError::MixedForms),
            (Some(shorthand), false) => Policy::parse(shorthand),
            (None, true) => {
                let capacity = self.capacity.ok_or(ConfigError::Incomplete)?;
                let refill_rate = self.refill_rate.ok_or(ConfigError::Incomplete)?;
                let period = self.refill_period_secs.ok_or(ConfigError::Incomplete)?;
                Policy::new(capacity, refill_rate, period)
            }
            (None, false) => Err(ConfigError::Incomplete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_period_units() {
        for (shorthand, secs) in [
            ("5/second", 1),
            ("5/minute", 60),
            ("5/hour", 3600),
            ("5/day", 86400),
        ] {
            let policy = Policy::parse(shorthand).unwrap();
            assert_eq!(policy.capacity(), 5.0);
            assert_eq!(policy.refill_rate(), 5.0);
            assert_eq!(policy.refill_period(), Duration::from_secs(secs));
        }
    }

    #[test]
    fn shorthand_matches_explicit_form() {
        let shorthand = Policy::parse("10/minute").unwrap();
        let explicit = Policy::new(10.0, 10.0, 60.0).unwrap();
        assert_eq!(shorthand, explicit);
    }

    #[test]
    fn rejects_malformed_shorthand() {
        assert!(matches!(
            Policy::parse("10 per minute"),
            Err(ConfigError::MalformedShorthand(_))
        ));
        assert!(matches!(
            Policy::parse("abc/minute"),
            Err(ConfigError::MalformedShorthand(_))
        ));
    }

    #[test]
    fn rejects_unknown_period() {
        assert_eq!(
            Policy::parse("10/fortnight"),
            Err(ConfigError::UnknownPeriod("fortnight".to_string()))
        );
    }

    #[test]
    fn rejects_non_positive_parameters() {
        assert!(matches!(
            Policy::new(0.0, 1.0, 1.0),
            Err(ConfigError::NonPositive {
                name: "capacity",
                ..
            })
        ));
        assert!(matches!(
            Policy::new(1.0, -1.0, 1.0),
            Err(ConfigError::NonPositive {
                name: "refill_rate",
                ..
            })
        ));
        assert!(matches!(
            Policy::new(1.0, 1.0, 0.0),
            Err(ConfigError::NonPositive {
                name: "refill_period_secs",
                ..
            })
        ));
        assert!(matches!(Policy::parse("0/minute"), Err(_)));
    }

    #[test]
    fn retry_after_rounds_up() {
        // 60s / 3 tokens = one token every 20s.
        let policy = Policy::new(3.0, 3.0, 60.0).unwrap();
        assert_eq!(policy.retry_after_secs(), 20);

        // 60s / 7 tokens = 8.57s, advertised as 9.
        let policy = Policy::new(7.0, 7.0, 60.0).unwrap();
        assert_eq!(policy.retry_after_secs(), 9);
    }

    #[test]
    fn config_rejects_mixed_forms() {
        let config = PolicyConfig {
            rate: Some("10/minute".to_string()),
            capacity: Some(10.0),
            ..PolicyConfig::default()
        };
        assert_eq!(config.build(), Err(ConfigError::MixedForms));
    }

    #[test]
    fn config_rejects_partial_explicit_form() {
        let config = PolicyConfig {
            capacity: Some(10.0),
            refill_rate: Some(5.0),
            ..PolicyConfig::default()
        };
        assert_eq!(config.build(), Err(ConfigError::Incomplete));
    }

    #[test]
    fn config_rejects_empty_form() {
        assert_eq!(PolicyConfig::default().build(), Err(ConfigError::Incomplete));
    }

    #[test]
    fn config_builds_both_forms() {
        let from_shorthand = PolicyConfig::shorthand("10/minute").build().unwrap();
        let from_explicit = PolicyConfig::explicit(10.0, 10.0, 60.0).build().unwrap();
        assert_eq!(from_shorthand, from_explicit);
    }

    #[test]
    fn config_deserializes_from_json() {
        let config: PolicyConfig = serde_json::from_str(r#"{"rate": "5/second"}"#).unwrap();
        let policy = config.build().unwrap();
        assert_eq!(policy.refill_period(), Duration::from_secs(1));
    }
}
