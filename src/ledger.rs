//! Wallet ledger.
//!
//! Single mutation point for every balance change on the platform. Each
//! credit or debit is an atomic check-and-update against one wallet entry and
//! appends exactly one transaction record to the journal. Balances are
//! unsigned and can never go negative; a debit that would overdraw is
//! rejected with the wallet untouched.

use crate::common::types::{
    Amount, Role, TransactionId, TransactionKind, UserId, WalletKind,
};
use crate::errors::{PlatformError, PlatformResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Per-user wallet with two independent balances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user: UserId,
    pub main: Amount,
    pub bonus: Amount,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    fn new(user: UserId) -> Self {
        let now = Utc::now();
        Self {
            user,
            main: 0,
            bonus: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn balance(&self, kind: WalletKind) -> Amount {
        match kind {
            WalletKind::Main => self.main,
            WalletKind::Bonus => self.bonus,
        }
    }
}

/// Immutable audit record, one per ledger mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: TransactionId,
    pub user: UserId,
    /// Account that initiated the mutation. None for system payouts.
    pub initiator: Option<UserId>,
    pub initiator_role: Role,
    pub amount: Amount,
    pub wallet: WalletKind,
    pub kind: TransactionKind,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Atomic balance mutation plus append-only journal
#[derive(Default)]
pub struct Ledger {
    wallets: DashMap<UserId, Wallet>,
    journal: RwLock<Vec<WalletTransaction>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a wallet, creating it on first use
    pub fn credit(
        &self,
        user: UserId,
        wallet: WalletKind,
        amount: Amount,
        kind: TransactionKind,
        initiator: Option<UserId>,
        initiator_role: Role,
        note: Option<String>,
    ) -> PlatformResult<Wallet> {
        if amount == 0 {
            return Err(PlatformError::Validation("amount must be positive".into()));
        }

        let snapshot = {
            let mut entry = self.wallets.entry(user).or_insert_with(|| Wallet::new(user));
            let balance = match wallet {
                WalletKind::Main => &mut entry.main,
                WalletKind::Bonus => &mut entry.bonus,
            };
            *balance = balance.checked_add(amount).ok_or_else(|| {
                PlatformError::Validation(format!("credit of {} overflows balance", amount))
            })?;
            entry.updated_at = Utc::now();
            entry.clone()
        };

        self.append(user, initiator, initiator_role, amount, wallet, kind, note);
        debug!(user = %user, %amount, wallet = %wallet, kind = %kind, "wallet credited");
        Ok(snapshot)
    }

    /// Debit a wallet. Fails without side effects if the balance is short.
    pub fn debit(
        &self,
        user: UserId,
        wallet: WalletKind,
        amount: Amount,
        kind: TransactionKind,
        initiator: Option<UserId>,
        initiator_role: Role,
        note: Option<String>,
    ) -> PlatformResult<Wallet> {
        if amount == 0 {
            return Err(PlatformError::Validation("amount must be positive".into()));
        }

        let snapshot = {
            let mut entry = self.wallets.get_mut(&user).ok_or(
                PlatformError::InsufficientBalance {
                    requested: amount,
                    available: 0,
                },
            )?;
            let balance = match wallet {
                WalletKind::Main => &mut entry.main,
                WalletKind::Bonus => &mut entry.bonus,
            };
            if *balance < amount {
                return Err(PlatformError::InsufficientBalance {
                    requested: amount,
                    available: *balance,
                });
            }
            *balance -= amount;
            entry.updated_at = Utc::now();
            entry.clone()
        };

        self.append(user, initiator, initiator_role, amount, wallet, kind, note);
        debug!(user = %user, %amount, wallet = %wallet, kind = %kind, "wallet debited");
        Ok(snapshot)
    }

    fn append(
        &self,
        user: UserId,
        initiator: Option<UserId>,
        initiator_role: Role,
        amount: Amount,
        wallet: WalletKind,
        kind: TransactionKind,
        note: Option<String>,
    ) {
        let txn = WalletTransaction {
            id: Uuid::new_v4(),
            user,
            initiator,
            initiator_role,
            amount,
            wallet,
            kind,
            note,
            created_at: Utc::now(),
        };
        self.journal.write().unwrap().push(txn);
    }

    /// Current wallet snapshot, creating the wallet on first access
    pub fn wallet(&self, user: UserId) -> Wallet {
        self.wallets
            .entry(user)
            .or_insert_with(|| Wallet::new(user))
            .clone()
    }

    /// Wallet snapshot without lazy creation
    pub fn wallet_if_exists(&self, user: UserId) -> Option<Wallet> {
        self.wallets.get(&user).map(|w| w.clone())
    }

    pub fn all_wallets(&self) -> Vec<Wallet> {
        self.wallets.iter().map(|w| w.clone()).collect()
    }

    /// Transactions for one user, newest first
    pub fn transactions_for(&self, user: UserId, limit: usize) -> Vec<WalletTransaction> {
        self.journal
            .read()
            .unwrap()
            .iter()
            .rev()
            .filter(|t| t.user == user)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Full journal, newest first
    pub fn transactions(&self, limit: usize) -> Vec<WalletTransaction> {
        self.journal
            .read()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}
