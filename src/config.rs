//! Configuration management with validation and defaults
//!
//! Nested sections with per-section defaults, loadable from TOML.

use crate::errors::{PlatformError, PlatformResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level platform configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub games: GameConfig,
    pub wallets: WalletConfig,
    pub scheduler: SchedulerConfig,
}

/// Game window and settlement rules
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Length of a betting window in minutes
    pub window_minutes: u64,
    /// How long after window start a game becomes due for settlement
    pub settlement_delay_minutes: u64,
    /// Optional stricter gate: reject bids this many minutes after window
    /// start even while the game is still open. None gates on status only.
    pub bid_cutoff_minutes: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_minutes: 30,
            settlement_delay_minutes: 25,
            bid_cutoff_minutes: None,
        }
    }
}

/// Recharge minimums by target role
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub agent_recharge_minimum: u64,
    pub user_recharge_minimum: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            agent_recharge_minimum: 1000,
            user_recharge_minimum: 500,
        }
    }
}

/// Timer intervals for the two background triggers
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the window opener checks for a missing game
    pub opener_interval_secs: u64,
    /// How often the settlement sweeper runs
    pub sweep_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            opener_interval_secs: 60,
            sweep_interval_secs: 300,
        }
    }
}

impl PlatformConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: impl AsRef<Path>) -> PlatformResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PlatformError::Validation(format!(
                "failed to read config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| PlatformError::Validation(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PlatformResult<()> {
        if self.games.window_minutes == 0 {
            return Err(PlatformError::Validation(
                "games.window_minutes must be positive".into(),
            ));
        }
        if self.games.settlement_delay_minutes == 0 {
            return Err(PlatformError::Validation(
                "games.settlement_delay_minutes must be positive".into(),
            ));
        }
        if self.scheduler.opener_interval_secs == 0 || self.scheduler.sweep_interval_secs == 0 {
            return Err(PlatformError::Validation(
                "scheduler intervals must be positive".into(),
            ));
        }
        Ok(())
    }
}
