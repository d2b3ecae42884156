//! Engine configuration.

use crate::core::{Error, Result};
use crate::decimal::DECIMALS;
use crate::store::StoreConfig;
use serde::{Deserialize, Serialize};

/// Environment variable prefix for [`EngineConfig::from_env`].
pub const ENV_PREFIX: &str = "GOVTALLY_";

/// Configuration for the governance engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Evaluate a proposal synchronously after each accepted vote
    pub evaluate_on_vote: bool,
    /// Fractional digits for reported averages and ratios
    pub average_digits: u32,
    /// Period of the deadline sweeper
    pub sweep_interval_secs: u64,
    /// Network passphrase bound into unsigned transactions; none disables them
    pub network_passphrase: Option<String>,
    /// Store configuration
    pub store: StoreConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evaluate_on_vote: true,
            average_digits: 4,
            sweep_interval_secs: 60,
            network_passphrase: None,
            store: StoreConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from `GOVTALLY_*` environment variables, defaulting missing ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut config = Self::default();

        if let Some(raw) = get("EVALUATE_ON_VOTE") {
            config.evaluate_on_vote = parse_bool("EVALUATE_ON_VOTE", &raw)?;
        }
        if let Some(raw) = get("AVERAGE_DIGITS") {
            config.average_digits = parse_num("AVERAGE_DIGITS", &raw)?;
        }
        if let Some(raw) = get("SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = parse_num("SWEEP_INTERVAL_SECS", &raw)?;
        }
        if let Some(raw) = get("NETWORK_PASSPHRASE") {
            config.network_passphrase = Some(raw).filter(|p| !p.is_empty());
        }
        if let Some(raw) = get("STORE_BACKEND") {
            config.store.backend = raw.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.average_digits > DECIMALS {
            return Err(Error::Config(format!(
                "average_digits must be at most {}, got {}",
                DECIMALS, self.average_digits
            )));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::Config("sweep_interval_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("{}{} must be a boolean, got '{}'", ENV_PREFIX, name, raw))),
    }
}

fn parse_num<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{}{} must be a number, got '{}'", ENV_PREFIX, name, raw)))
}
