//! Withdrawal lifecycle.
//!
//! A request debits the chosen balance up front and parks a pending record.
//! Rejection refunds through the ledger, so the money trail stays complete.
//! Status moves Pending to Approved/Rejected/Completed under the record's
//! exclusive entry guard; a rejection can never refund twice.

use crate::common::types::{Amount, TransactionKind, UserId, WalletKind, WithdrawalId};
use crate::errors::{PlatformError, PlatformResult};
use crate::ledger::Ledger;
use crate::policy::Capabilities;
use crate::users::UserRegistry;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub user: UserId,
    pub amount: Amount,
    pub wallet: WalletKind,
    pub status: WithdrawalStatus,
    pub note: Option<String>,
    pub processed_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

pub struct WithdrawalDesk {
    ledger: Arc<Ledger>,
    users: Arc<UserRegistry>,
    withdrawals: DashMap<WithdrawalId, Withdrawal>,
}

impl WithdrawalDesk {
    pub fn new(ledger: Arc<Ledger>, users: Arc<UserRegistry>) -> Self {
        Self {
            ledger,
            users,
            withdrawals: DashMap::new(),
        }
    }

    /// Debit the balance and record a pending withdrawal
    pub fn request(
        &self,
        user_id: UserId,
        amount: Amount,
        wallet: WalletKind,
        note: Option<String>,
    ) -> PlatformResult<Withdrawal> {
        let user = self.users.require(user_id)?;
        Capabilities::for_actor(&user).require_request_withdrawal()?;

        self.ledger.debit(
            user.id,
            wallet,
            amount,
            TransactionKind::Debit,
            Some(user.id),
            user.role,
            Some(note.clone().unwrap_or_else(|| "Withdrawal request".into())),
        )?;

        let withdrawal = Withdrawal {
            id: Uuid::new_v4(),
            user: user.id,
            amount,
            wallet,
            status: WithdrawalStatus::Pending,
            note,
            processed_by: None,
            created_at: Utc::now(),
        };
        self.withdrawals.insert(withdrawal.id, withdrawal.clone());
        info!(withdrawal = %withdrawal.id, user = %user.id, amount, "withdrawal requested");
        Ok(withdrawal)
    }

    pub fn approve(&self, actor_id: UserId, id: WithdrawalId) -> PlatformResult<Withdrawal> {
        self.transition(actor_id, id, WithdrawalStatus::Approved)
    }

    /// Reject a withdrawal and return the held amount to the wallet
    pub fn reject(&self, actor_id: UserId, id: WithdrawalId) -> PlatformResult<Withdrawal> {
        let rejected = self.transition(actor_id, id, WithdrawalStatus::Rejected)?;
        self.ledger.credit(
            rejected.user,
            rejected.wallet,
            rejected.amount,
            TransactionKind::Refund,
            Some(actor_id),
            self.users.require(actor_id)?.role,
            Some(format!("Refund for rejected withdrawal {}", rejected.id)),
        )?;
        Ok(rejected)
    }

    pub fn complete(&self, actor_id: UserId, id: WithdrawalId) -> PlatformResult<Withdrawal> {
        self.transition(actor_id, id, WithdrawalStatus::Completed)
    }

    fn transition(
        &self,
        actor_id: UserId,
        id: WithdrawalId,
        to: WithdrawalStatus,
    ) -> PlatformResult<Withdrawal> {
        let actor = self.users.require(actor_id)?;
        Capabilities::for_actor(&actor).require_process_withdrawal()?;

        let mut entry = self
            .withdrawals
            .get_mut(&id)
            .ok_or_else(|| PlatformError::not_found("withdrawal", id))?;

        let allowed = matches!(
            (entry.status, to),
            (WithdrawalStatus::Pending, WithdrawalStatus::Approved)
                | (WithdrawalStatus::Pending, WithdrawalStatus::Rejected)
                | (WithdrawalStatus::Pending, WithdrawalStatus::Completed)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Rejected)
                | (WithdrawalStatus::Approved, WithdrawalStatus::Completed)
        );
        if !allowed {
            return Err(PlatformError::Precondition(format!(
                "withdrawal {} cannot move from {:?} to {:?}",
                id, entry.status, to
            )));
        }

        entry.status = to;
        entry.processed_by = Some(actor.id);
        info!(withdrawal = %id, actor = %actor.id, status = ?to, "withdrawal processed");
        Ok(entry.clone())
    }

    pub fn get(&self, id: WithdrawalId) -> Option<Withdrawal> {
        self.withdrawals.get(&id).map(|w| w.clone())
    }

    /// Withdrawals for one user, newest first
    pub fn list_for_user(&self, user: UserId, limit: usize) -> Vec<Withdrawal> {
        let mut list: Vec<Withdrawal> = self
            .withdrawals
            .iter()
            .filter(|w| w.user == user)
            .map(|w| w.clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list.truncate(limit);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Role;

    struct Fixture {
        ledger: Arc<Ledger>,
        users: Arc<UserRegistry>,
        desk: WithdrawalDesk,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(Ledger::new());
        let users = Arc::new(UserRegistry::new());
        let desk = WithdrawalDesk::new(Arc::clone(&ledger), Arc::clone(&users));
        Fixture {
            ledger,
            users,
            desk,
        }
    }

    fn funded_user(fx: &Fixture, balance: Amount) -> UserId {
        let user = fx.users.register("User", Role::User, None).unwrap();
        fx.ledger
            .credit(
                user.id,
                WalletKind::Main,
                balance,
                TransactionKind::Recharge,
                None,
                Role::Admin,
                None,
            )
            .unwrap();
        user.id
    }

    #[test]
    fn test_request_debits_immediately() {
        let fx = fixture();
        let user = funded_user(&fx, 1000);

        let withdrawal = fx
            .desk
            .request(user, 400, WalletKind::Main, None)
            .unwrap();
        assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
        assert_eq!(fx.ledger.wallet(user).main, 600);
    }

    #[test]
    fn test_request_with_short_balance_fails_clean() {
        let fx = fixture();
        let user = funded_user(&fx, 100);

        let err = fx
            .desk
            .request(user, 400, WalletKind::Main, None)
            .unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_BALANCE");
        assert_eq!(fx.ledger.wallet(user).main, 100);
        assert!(fx.desk.list_for_user(user, 10).is_empty());
    }

    #[test]
    fn test_reject_refunds_exactly_once() {
        let fx = fixture();
        let admin = fx.users.register("Admin", Role::Admin, None).unwrap();
        let user = funded_user(&fx, 1000);

        let withdrawal = fx
            .desk
            .request(user, 400, WalletKind::Main, None)
            .unwrap();
        fx.desk.reject(admin.id, withdrawal.id).unwrap();
        assert_eq!(fx.ledger.wallet(user).main, 1000);

        // A second rejection is refused and no further refund is issued
        let err = fx.desk.reject(admin.id, withdrawal.id).unwrap_err();
        assert_eq!(err.code(), "PRECONDITION");
        assert_eq!(fx.ledger.wallet(user).main, 1000);

        // Debit plus refund in the journal, both tied to this user
        let kinds: Vec<TransactionKind> = fx
            .ledger
            .transactions_for(user, 10)
            .iter()
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TransactionKind::Refund,
                TransactionKind::Debit,
                TransactionKind::Recharge
            ]
        );
    }

    #[test]
    fn test_completed_withdrawal_cannot_be_rejected() {
        let fx = fixture();
        let agent = fx.users.register("Agent", Role::Agent, None).unwrap();
        let user = funded_user(&fx, 1000);

        let withdrawal = fx
            .desk
            .request(user, 400, WalletKind::Main, None)
            .unwrap();
        fx.desk.approve(agent.id, withdrawal.id).unwrap();
        fx.desk.complete(agent.id, withdrawal.id).unwrap();

        assert!(fx.desk.reject(agent.id, withdrawal.id).is_err());
        assert_eq!(fx.ledger.wallet(user).main, 600);
    }

    #[test]
    fn test_users_cannot_process_withdrawals() {
        let fx = fixture();
        let user = funded_user(&fx, 1000);
        let withdrawal = fx
            .desk
            .request(user, 400, WalletKind::Main, None)
            .unwrap();

        let err = fx.desk.approve(user, withdrawal.id).unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }
}
