//! Role capability policy.
//!
//! Each operation builds a `Capabilities` for the acting account and asks it
//! one explicit question, instead of scattering role comparisons through the
//! call sites.

use crate::common::types::{AccountStatus, Amount, Role, User};
use crate::config::WalletConfig;
use crate::errors::{PlatformError, PlatformResult};

/// How a permitted recharge must be executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RechargeRule {
    /// Smallest amount the initiator may transfer to this target
    pub minimum: Amount,
    /// Whether the amount is debited from the initiator's own main balance
    pub funded_by_initiator: bool,
}

/// Permission predicates for one acting account
pub struct Capabilities<'a> {
    actor: &'a User,
}

impl<'a> Capabilities<'a> {
    pub fn for_actor(actor: &'a User) -> Self {
        Self { actor }
    }

    fn require_active(&self) -> PlatformResult<()> {
        match self.actor.status {
            AccountStatus::Active => Ok(()),
            AccountStatus::Disabled | AccountStatus::Banned => Err(PlatformError::Forbidden(
                format!("account {} is not active", self.actor.id),
            )),
        }
    }

    fn require_role(&self, role: Role, action: &str) -> PlatformResult<()> {
        self.require_active()?;
        if self.actor.role == role {
            Ok(())
        } else {
            Err(PlatformError::Forbidden(format!(
                "only {} accounts may {}",
                role, action
            )))
        }
    }

    pub fn require_place_bid(&self) -> PlatformResult<()> {
        self.require_role(Role::User, "place bids")
    }

    pub fn require_create_game(&self) -> PlatformResult<()> {
        self.require_role(Role::Admin, "create games")
    }

    pub fn require_declare_winner(&self) -> PlatformResult<()> {
        self.require_role(Role::Admin, "declare winners")
    }

    pub fn require_override_result(&self) -> PlatformResult<()> {
        self.require_role(Role::Admin, "override results")
    }

    pub fn require_manual_debit(&self) -> PlatformResult<()> {
        self.require_role(Role::Admin, "debit wallets")
    }

    pub fn require_update_commission(&self) -> PlatformResult<()> {
        self.require_role(Role::Admin, "update commission settings")
    }

    pub fn require_request_withdrawal(&self) -> PlatformResult<()> {
        self.require_role(Role::User, "request withdrawals")
    }

    pub fn require_process_withdrawal(&self) -> PlatformResult<()> {
        self.require_active()?;
        match self.actor.role {
            Role::Admin | Role::Agent => Ok(()),
            Role::User => Err(PlatformError::Forbidden(
                "only admin or agent accounts may process withdrawals".into(),
            )),
        }
    }

    /// Evaluate whether the actor may recharge `target`, and under which rule.
    ///
    /// Admins recharge anyone from platform funds, subject to role minimums.
    /// Agents recharge only their own assigned users and pay out of their
    /// own main balance.
    pub fn recharge_rule(&self, target: &User, config: &WalletConfig) -> PlatformResult<RechargeRule> {
        self.require_active()?;
        match self.actor.role {
            Role::Admin => {
                let minimum = match target.role {
                    Role::Agent => config.agent_recharge_minimum,
                    _ => config.user_recharge_minimum,
                };
                Ok(RechargeRule {
                    minimum,
                    funded_by_initiator: false,
                })
            }
            Role::Agent => {
                if target.role != Role::User {
                    return Err(PlatformError::Forbidden(
                        "agents can only recharge users".into(),
                    ));
                }
                if target.assigned_agent != Some(self.actor.id) {
                    return Err(PlatformError::Forbidden(
                        "agents can only recharge their assigned users".into(),
                    ));
                }
                Ok(RechargeRule {
                    minimum: config.user_recharge_minimum,
                    funded_by_initiator: true,
                })
            }
            Role::User => Err(PlatformError::Forbidden(
                "users cannot recharge wallets".into(),
            )),
        }
    }
}
