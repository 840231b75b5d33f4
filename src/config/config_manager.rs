// src/config/config_manager.rs

use std::fs;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::model::creative::Creative;

fn default_pacer_period_ms() -> u64 {
    300_000
}

fn default_budget_per_period() -> f64 {
    500_000.0
}

fn default_bid_timeout_ms() -> u64 {
    100
}

/// Which pricing strategy the agent runs with.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[default]
    FixedPrice,
    Paced,
}

/// Agent configuration, loaded once at startup and immutable
/// thereafter. Field names follow the upstream agent-config JSON.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Fraction of requests the agent is willing to bid on. Part of
    /// the agent-config contract; the shipped strategies bid on every
    /// request regardless.
    pub bid_probability: f64,
    /// Constant bid price (the paced strategy scales it down).
    pub fixed_price: f64,
    pub creatives: Vec<Creative>,
    /// Budget account key, e.g. "hello:world".
    pub account: String,
    /// Banker host:port, no scheme.
    pub banker_address: String,
    #[serde(default = "default_pacer_period_ms")]
    pub pacer_period_ms: u64,
    /// Intended spend (USD/1M) reported to the banker each period.
    #[serde(default = "default_budget_per_period")]
    pub budget_per_period: f64,
    /// Deadline for the decode→price→encode path of one request.
    #[serde(default = "default_bid_timeout_ms")]
    pub bid_timeout_ms: u64,
    #[serde(default)]
    pub strategy: StrategyKind,
}

impl AgentConfig {
    /// Startup sanity checks. Any failure here aborts the process: a
    /// bidder must not come up in a state it cannot bid from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.creatives.is_empty() {
            return Err(ConfigError::Invalid(
                "creative catalog must not be empty".to_string(),
            ));
        }
        if !self.fixed_price.is_finite() || self.fixed_price < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "fixedPrice must be a finite value >= 0, got {}",
                self.fixed_price
            )));
        }
        if !(0.0..=1.0).contains(&self.bid_probability) {
            return Err(ConfigError::Invalid(format!(
                "bidProbability must be within [0, 1], got {}",
                self.bid_probability
            )));
        }
        if self.account.is_empty() {
            return Err(ConfigError::Invalid("account must not be empty".to_string()));
        }
        if self.banker_address.is_empty() {
            return Err(ConfigError::Invalid(
                "bankerAddress must not be empty".to_string(),
            ));
        }
        if self.pacer_period_ms == 0 {
            return Err(ConfigError::Invalid(
                "pacerPeriodMs must be greater than zero".to_string(),
            ));
        }
        if !self.budget_per_period.is_finite() || self.budget_per_period <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "budgetPerPeriod must be a finite value > 0, got {}",
                self.budget_per_period
            )));
        }
        if self.bid_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "bidTimeoutMs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Source of the agent configuration.
pub trait ConfigAdapter: Send + Sync {
    fn load(&self) -> Result<AgentConfig, ConfigError>;
}

/// Reads the agent config from a JSON file.
pub struct FileConfigAdapter {
    pub path: String,
}

impl FileConfigAdapter {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

impl ConfigAdapter for FileConfigAdapter {
    fn load(&self) -> Result<AgentConfig, ConfigError> {
        let content = fs::read_to_string(&self.path)?;
        let config: AgentConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
