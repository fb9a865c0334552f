// 7.0 config.rs: market setup in one place. which denominations trade and how the
// engine is tuned. loadable from TOML so every node starts from the same file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::engine::{Engine, EngineConfig, EngineConfigError, EngineError};
use crate::types::Denom;

/// Complete configuration for a market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    // Denominations registered at startup. Every ordered pair becomes an instrument.
    pub denominations: Vec<String>,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            denominations: vec!["eur".to_string(), "usd".to_string(), "chf".to_string()],
            engine: EngineConfig::default(),
        }
    }
}

impl MarketConfig {
    // Local runs: small event log, every event logged
    pub fn development() -> Self {
        Self {
            engine: EngineConfig {
                max_events: 10_000,
                log_events: true,
                ..EngineConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn testnet() -> Self {
        Self {
            denominations: ["eur", "usd", "chf", "gbp", "jpy", "ngm"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            engine: EngineConfig::default(),
        }
    }

    // Mainnet: market orders never rest, large audit buffer
    pub fn mainnet() -> Self {
        Self {
            denominations: ["eur", "usd", "chf", "gbp", "sek", "nok", "dkk"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            engine: EngineConfig {
                max_events: 1_000_000,
                reject_market_gtc_on_empty_book: true,
                log_events: false,
                ..EngineConfig::default()
            },
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: MarketConfig = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::FileRead(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Parsed denominations, in declaration order.
    pub fn denoms(&self) -> Result<Vec<Denom>, ConfigError> {
        let mut seen = BTreeSet::new();
        let mut denoms = Vec::with_capacity(self.denominations.len());
        for text in &self.denominations {
            let denom = Denom::new(text).ok_or_else(|| ConfigError::InvalidDenomination(text.clone()))?;
            if !seen.insert(denom.clone()) {
                return Err(ConfigError::DuplicateDenomination(denom.to_string()));
            }
            denoms.push(denom);
        }
        Ok(denoms)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.denominations.len() < 2 {
            return Err(ConfigError::TooFewDenominations(self.denominations.len()));
        }
        self.denoms()?;
        self.engine.validate()?;
        Ok(())
    }

    /// Builds an engine with every configured denomination registered.
    pub fn build_engine(&self) -> Result<Engine, ConfigError> {
        self.validate()?;
        let mut engine = Engine::new(self.engine.clone())?;
        for denom in &self.denominations {
            engine.register_denom(denom)?;
        }
        Ok(engine)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    FileRead(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("'{0}' is not a valid denomination")]
    InvalidDenomination(String),

    #[error("Denomination {0} listed twice")]
    DuplicateDenomination(String),

    #[error("At least two denominations are needed to trade, got {0}")]
    TooFewDenominations(usize),

    #[error(transparent)]
    Engine(#[from] EngineConfigError),

    #[error(transparent)]
    Setup(#[from] EngineError),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> MarketConfig {
        match self {
            Environment::Development => MarketConfig::development(),
            Environment::Testnet => MarketConfig::testnet(),
            Environment::Mainnet => MarketConfig::mainnet(),
        }
    }
}
