/**
 * Emojimon Client Configuration
 *
 */
use crate::authority::TxOptions;
use emojimon_common::Address;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Account used when none is configured (first anvil test account)
pub const DEFAULT_PLAYER_ADDRESS: &str = "0x864215F6080B2f4551Eae20330a470e085192d44";

/// How many past confirmations the transaction stream remembers
pub const CONFIRMATION_HISTORY: usize = 1024;

/// Chance that a step onto tall grass starts an encounter in the local world
pub const DEFAULT_ENCOUNTER_CHANCE: f64 = 0.2;

pub const DEFAULT_SEED: u64 = 0x5eed;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Settings of the in-process world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevnetConfig {
    pub seed: u64,
    pub encounter_chance: f64,
    /// Confirm transactions as soon as they are accepted
    pub auto_confirm: bool,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            encounter_chance: DEFAULT_ENCOUNTER_CHANCE,
            auto_confirm: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub player_address: String,
    pub tx_options: TxOptions,
    pub confirmation_history: usize,
    pub devnet: DevnetConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            player_address: DEFAULT_PLAYER_ADDRESS.to_string(),
            tx_options: TxOptions::default(),
            confirmation_history: CONFIRMATION_HISTORY,
            devnet: DevnetConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Read an optional JSON file, then apply `EMOJIMON_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => ClientConfig::default(),
        };
        base.with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from a variable lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("EMOJIMON_PLAYER") {
            self.player_address = value;
        }
        if let Some(value) = lookup("EMOJIMON_GAS_LIMIT") {
            self.tx_options.gas_limit = parse_var("EMOJIMON_GAS_LIMIT", &value)?;
        }
        if let Some(value) = lookup("EMOJIMON_CONFIRMATION_HISTORY") {
            self.confirmation_history = parse_var("EMOJIMON_CONFIRMATION_HISTORY", &value)?;
        }
        if let Some(value) = lookup("EMOJIMON_SEED") {
            self.devnet.seed = parse_var("EMOJIMON_SEED", &value)?;
        }
        if let Some(value) = lookup("EMOJIMON_ENCOUNTER_CHANCE") {
            let chance: f64 = parse_var("EMOJIMON_ENCOUNTER_CHANCE", &value)?;
            if !(0.0..=1.0).contains(&chance) {
                return Err(ConfigError::Invalid { var: "EMOJIMON_ENCOUNTER_CHANCE", value });
            }
            self.devnet.encounter_chance = chance;
        }
        if let Some(value) = lookup("EMOJIMON_AUTO_CONFIRM") {
            self.devnet.auto_confirm = parse_var("EMOJIMON_AUTO_CONFIRM", &value)?;
        }
        self.player()?;
        Ok(self)
    }

    pub fn player(&self) -> Result<Address, ConfigError> {
        self.player_address.parse().map_err(|_| ConfigError::Invalid {
            var: "player_address",
            value: self.player_address.clone(),
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}
