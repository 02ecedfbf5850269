//! Commission settings and the pool split computation.
//!
//! Settings are append-only; the current configuration is always the most
//! recently written record. The split itself is a pure function and the
//! three amounts always sum exactly to the pool, with any floor-rounding
//! remainder absorbed by the admin fee.

use crate::common::types::Amount;
use crate::errors::{PlatformError, PlatformResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Versioned payout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionSettings {
    pub id: Uuid,
    /// Percentage of the pool reserved for agent commission
    pub agent_pct: u8,
    /// Percentage of the pool distributed to winners
    pub winner_pct: u8,
    /// Percentage kept by the platform
    pub admin_pct: u8,
    pub min_bet: Amount,
    pub max_bet: Amount,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
}

impl CommissionSettings {
    fn validate(&self) -> PlatformResult<()> {
        let total = u16::from(self.agent_pct) + u16::from(self.winner_pct) + u16::from(self.admin_pct);
        if total > 100 {
            return Err(PlatformError::Validation(format!(
                "commission percentages sum to {}, must not exceed 100",
                total
            )));
        }
        if self.min_bet == 0 {
            return Err(PlatformError::Validation("min_bet must be positive".into()));
        }
        if self.min_bet >= self.max_bet {
            return Err(PlatformError::Validation(
                "min_bet must be less than max_bet".into(),
            ));
        }
        Ok(())
    }
}

/// How one settled pool divides between agents, winners and the platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommissionSplit {
    pub total_pool: Amount,
    pub agent_commission: Amount,
    pub winner_payout: Amount,
    pub admin_fee: Amount,
}

/// Divide `total_pool` per the settings percentages. Floor rounding on the
/// agent and winner shares leaves the remainder in the admin fee, so the
/// three parts always reassemble the pool exactly.
pub fn split(total_pool: Amount, settings: &CommissionSettings) -> CommissionSplit {
    let agent_commission = percentage_of(total_pool, settings.agent_pct);
    let winner_payout = percentage_of(total_pool, settings.winner_pct);
    let admin_fee = total_pool - agent_commission - winner_payout;
    CommissionSplit {
        total_pool,
        agent_commission,
        winner_payout,
        admin_fee,
    }
}

/// floor(amount * pct / 100) without intermediate overflow
pub fn percentage_of(amount: Amount, pct: u8) -> Amount {
    (u128::from(amount) * u128::from(pct) / 100) as Amount
}

/// Append-only settings history
pub struct CommissionVault {
    history: RwLock<Vec<CommissionSettings>>,
}

impl Default for CommissionVault {
    fn default() -> Self {
        Self::new()
    }
}

impl CommissionVault {
    pub fn new() -> Self {
        Self {
            history: RwLock::new(Vec::new()),
        }
    }

    /// Most recently written settings, if any are configured
    pub fn current(&self) -> Option<CommissionSettings> {
        self.history.read().unwrap().last().cloned()
    }

    /// Current settings, seeding the platform defaults on first use
    pub fn current_or_seed(&self) -> CommissionSettings {
        if let Some(settings) = self.current() {
            return settings;
        }
        let mut history = self.history.write().unwrap();
        // Re-check after taking the write lock
        if let Some(settings) = history.last() {
            return settings.clone();
        }
        let defaults = CommissionSettings {
            id: Uuid::new_v4(),
            agent_pct: 5,
            winner_pct: 80,
            admin_pct: 15,
            min_bet: 10,
            max_bet: 10_000,
            updated_by: "system".into(),
            created_at: Utc::now(),
        };
        history.push(defaults.clone());
        info!("seeded default commission settings");
        defaults
    }

    /// Append a new settings version. History is never updated in place.
    pub fn update(
        &self,
        agent_pct: u8,
        winner_pct: u8,
        admin_pct: u8,
        min_bet: Amount,
        max_bet: Amount,
        updated_by: impl Into<String>,
    ) -> PlatformResult<CommissionSettings> {
        let settings = CommissionSettings {
            id: Uuid::new_v4(),
            agent_pct,
            winner_pct,
            admin_pct,
            min_bet,
            max_bet,
            updated_by: updated_by.into(),
            created_at: Utc::now(),
        };
        settings.validate()?;
        self.history.write().unwrap().push(settings.clone());
        info!(agent_pct, winner_pct, admin_pct, "commission settings updated");
        Ok(settings)
    }

    /// Most recent versions, newest first
    pub fn history(&self, limit: usize) -> Vec<CommissionSettings> {
        self.history
            .read()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}
