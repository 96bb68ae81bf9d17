//! Role directory
//!
//! Resolves an actor to the roles they hold. The engine asks it once per
//! operation; it never caches answers.

use async_trait::async_trait;
use casework_types::{ActorId, CaseError, CaseResult, Role};
use std::collections::HashMap;
use std::sync::RwLock;

/// Resolves actors to roles for precondition checks
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Roles held by `actor_id`; empty for unknown actors.
    async fn roles_of(&self, actor_id: &ActorId) -> CaseResult<Vec<Role>>;

    async fn has_role(&self, actor_id: &ActorId, role: Role) -> CaseResult<bool> {
        Ok(self.roles_of(actor_id).await?.contains(&role))
    }
}

/// A fixed in-memory role table
#[derive(Default)]
pub struct StaticRoleDirectory {
    roles: RwLock<HashMap<ActorId, Vec<Role>>>,
}

impl StaticRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style grant
    pub fn with_actor(self, actor_id: impl Into<String>, roles: &[Role]) -> Self {
        self.grant(ActorId::new(actor_id), roles);
        self
    }

    /// Add roles to an actor
    pub fn grant(&self, actor_id: ActorId, roles: &[Role]) {
        let mut guard = self.roles.write().unwrap_or_else(|e| e.into_inner());
        let held = guard.entry(actor_id).or_default();
        for role in roles {
            if !held.contains(role) {
                held.push(*role);
            }
        }
    }

    /// Remove every role from an actor
    pub fn revoke_all(&self, actor_id: &ActorId) {
        let mut guard = self.roles.write().unwrap_or_else(|e| e.into_inner());
        guard.remove(actor_id);
    }
}

#[async_trait]
impl RoleDirectory for StaticRoleDirectory {
    async fn roles_of(&self, actor_id: &ActorId) -> CaseResult<Vec<Role>> {
        let guard = self
            .roles
            .read()
            .map_err(|_| CaseError::Store("role table lock poisoned".to_string()))?;
        Ok(guard.get(actor_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_directory() {
        let dir = StaticRoleDirectory::new()
            .with_actor("clerk-1", &[Role::IntakeClerk])
            .with_actor("mgr-1", &[Role::Manager, Role::IntakeClerk]);

        assert!(dir
            .has_role(&ActorId::new("clerk-1"), Role::IntakeClerk)
            .await
            .unwrap());
        assert!(!dir
            .has_role(&ActorId::new("clerk-1"), Role::Manager)
            .await
            .unwrap());
        assert_eq!(
            dir.roles_of(&ActorId::new("mgr-1")).await.unwrap().len(),
            2
        );
        assert!(dir
            .roles_of(&ActorId::new("stranger"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_grant_is_idempotent_and_revocable() {
        let dir = StaticRoleDirectory::new();
        let actor = ActorId::new("rev-1");
        dir.grant(actor.clone(), &[Role::TechnicalReviewer]);
        dir.grant(actor.clone(), &[Role::TechnicalReviewer]);
        assert_eq!(dir.roles_of(&actor).await.unwrap().len(), 1);

        dir.revoke_all(&actor);
        assert!(dir.roles_of(&actor).await.unwrap().is_empty());
    }
}
