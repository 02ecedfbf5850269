//! Wallet operations above the ledger: recharge and manual debit.
//!
//! Recharge rules depend on who is asking. Admins top up anyone from
//! platform funds; agents fund their assigned users out of their own main
//! balance, which produces two journal entries, the agent debit and the
//! target credit.

use crate::common::types::{Amount, TransactionKind, UserId, WalletKind};
use crate::config::WalletConfig;
use crate::errors::{PlatformError, PlatformResult};
use crate::ledger::{Ledger, Wallet};
use crate::policy::Capabilities;
use crate::users::UserRegistry;
use std::sync::Arc;
use tracing::info;

pub struct WalletDesk {
    ledger: Arc<Ledger>,
    users: Arc<UserRegistry>,
    config: WalletConfig,
}

impl WalletDesk {
    pub fn new(ledger: Arc<Ledger>, users: Arc<UserRegistry>, config: WalletConfig) -> Self {
        Self {
            ledger,
            users,
            config,
        }
    }

    /// Credit a user's wallet on behalf of an admin or an agent
    pub fn recharge(
        &self,
        initiator_id: UserId,
        target_id: UserId,
        amount: Amount,
        wallet: WalletKind,
        note: Option<String>,
    ) -> PlatformResult<Wallet> {
        let initiator = self.users.require(initiator_id)?;
        let target = self.users.require(target_id)?;
        let rule = Capabilities::for_actor(&initiator).recharge_rule(&target, &self.config)?;

        if amount < rule.minimum {
            return Err(PlatformError::Validation(format!(
                "recharge of {} is below the minimum of {} for {} accounts",
                amount, rule.minimum, target.role
            )));
        }

        if rule.funded_by_initiator {
            self.ledger.debit(
                initiator.id,
                WalletKind::Main,
                amount,
                TransactionKind::Debit,
                Some(initiator.id),
                initiator.role,
                Some(format!("Recharge to user {}", target.id)),
            )?;
        }

        let balance = self.ledger.credit(
            target.id,
            wallet,
            amount,
            TransactionKind::Recharge,
            Some(initiator.id),
            initiator.role,
            note,
        )?;
        info!(
            initiator = %initiator.id,
            target = %target.id,
            amount,
            wallet = %wallet,
            "wallet recharged"
        );
        Ok(balance)
    }

    /// Admin-only direct debit against any user's balance
    pub fn manual_debit(
        &self,
        initiator_id: UserId,
        target_id: UserId,
        amount: Amount,
        wallet: WalletKind,
        note: Option<String>,
    ) -> PlatformResult<Wallet> {
        let initiator = self.users.require(initiator_id)?;
        Capabilities::for_actor(&initiator).require_manual_debit()?;
        let target = self.users.require(target_id)?;

        let balance = self.ledger.debit(
            target.id,
            wallet,
            amount,
            TransactionKind::Debit,
            Some(initiator.id),
            initiator.role,
            Some(note.unwrap_or_else(|| "Manual debit by admin".into())),
        )?;
        info!(initiator = %initiator.id, target = %target.id, amount, "manual debit applied");
        Ok(balance)
    }

    /// Current wallet for a user, created on first access
    pub fn wallet(&self, user_id: UserId) -> PlatformResult<Wallet> {
        self.users.require(user_id)?;
        Ok(self.ledger.wallet(user_id))
    }
}
