use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type UserId = Uuid;
pub type GameId = Uuid;
pub type BidId = Uuid;
pub type TransactionId = Uuid;
pub type WithdrawalId = Uuid;
pub type OverrideId = Uuid;

/// Monetary amount in the currency's smallest unit (paise)
pub type Amount = u64;

/// Account roles in the three-tier hierarchy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Agent => write!(f, "agent"),
            Role::User => write!(f, "user"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Disabled,
    Banned,
}

/// Which of a wallet's two balances an operation targets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Main,
    Bonus,
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletKind::Main => write!(f, "main"),
            WalletKind::Bonus => write!(f, "bonus"),
        }
    }
}

/// Audit classification of a ledger mutation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Recharge,
    Debit,
    Refund,
    Bonus,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Recharge => write!(f, "recharge"),
            TransactionKind::Debit => write!(f, "debit"),
            TransactionKind::Refund => write!(f, "refund"),
            TransactionKind::Bonus => write!(f, "bonus"),
        }
    }
}

/// Minimal account record the core needs for policy and commission routing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    /// Agent responsible for this user, if any. Only meaningful for Role::User.
    pub assigned_agent: Option<UserId>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}
