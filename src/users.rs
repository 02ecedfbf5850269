//! In-core account registry.
//!
//! The core only needs enough of an account to route money and evaluate
//! policy: role, status and the assigned agent. Profile data, credentials
//! and onboarding live with the HTTP collaborator.

use crate::common::types::{AccountStatus, Role, User, UserId};
use crate::errors::{PlatformError, PlatformResult};
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct UserRegistry {
    users: DashMap<UserId, User>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account. Users may carry an assigned agent, which must
    /// reference an existing agent account.
    pub fn register(
        &self,
        name: impl Into<String>,
        role: Role,
        assigned_agent: Option<UserId>,
    ) -> PlatformResult<User> {
        let name = name.into();
        if name.trim().len() < 2 {
            return Err(PlatformError::Validation(
                "name must be at least 2 characters".into(),
            ));
        }
        if let Some(agent_id) = assigned_agent {
            if role != Role::User {
                return Err(PlatformError::Validation(
                    "only users can have an assigned agent".into(),
                ));
            }
            let agent = self.require(agent_id)?;
            if agent.role != Role::Agent {
                return Err(PlatformError::Validation(format!(
                    "assigned agent {} is not an agent account",
                    agent_id
                )));
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            name,
            role,
            assigned_agent,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    pub fn get(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|u| u.clone())
    }

    pub fn require(&self, id: UserId) -> PlatformResult<User> {
        self.get(id)
            .ok_or_else(|| PlatformError::not_found("user", id))
    }

    pub fn set_status(&self, id: UserId, status: AccountStatus) -> PlatformResult<User> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| PlatformError::not_found("user", id))?;
        user.status = status;
        Ok(user.clone())
    }

    /// All users assigned to the given agent
    pub fn assigned_to(&self, agent_id: UserId) -> Vec<User> {
        self.users
            .iter()
            .filter(|u| u.assigned_agent == Some(agent_id))
            .map(|u| u.clone())
            .collect()
    }
}
