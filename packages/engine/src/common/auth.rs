//! Caller identity consumed from the external identity provider.
//!
//! The engine never authenticates anyone. Callers arrive as an `Actor`
//! (id + role) resolved upstream; this module only answers "may this actor
//! perform that operation".

use serde::{Deserialize, Serialize};

use crate::common::{EngineError, EngineResult, UserId};

/// Role granted by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Manager,
    Moderator,
    Admin,
}

/// The caller of an engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Moderators and admins may resolve reviews.
    pub fn can_moderate(&self) -> bool {
        matches!(self.role, Role::Moderator | Role::Admin)
    }

    /// Managers and admins may create and operate listings.
    pub fn can_manage(&self) -> bool {
        matches!(self.role, Role::Manager | Role::Admin)
    }

    pub fn require_admin(&self) -> EngineResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(EngineError::Authorization("admin access required".into()))
        }
    }

    pub fn require_moderator(&self) -> EngineResult<()> {
        if self.can_moderate() {
            Ok(())
        } else {
            Err(EngineError::Authorization(
                "moderator access required".into(),
            ))
        }
    }

    /// The actor must be the given manager, or an admin override.
    pub fn require_manager_of(&self, manager_id: UserId) -> EngineResult<()> {
        if self.is_admin() || self.id == manager_id {
            Ok(())
        } else {
            Err(EngineError::Authorization(
                "only the service manager may perform this action".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_overrides_ownership() {
        let manager = UserId::new();
        let admin = Actor::new(UserId::new(), Role::Admin);
        assert!(admin.require_manager_of(manager).is_ok());
    }

    #[test]
    fn test_manager_must_own_service() {
        let manager = UserId::new();
        let actor = Actor::new(UserId::new(), Role::Manager);
        assert!(actor.require_manager_of(manager).is_err());
        let owner = Actor::new(manager, Role::Manager);
        assert!(owner.require_manager_of(manager).is_ok());
    }

    #[test]
    fn test_moderator_check() {
        assert!(Actor::new(UserId::new(), Role::Moderator)
            .require_moderator()
            .is_ok());
        assert!(Actor::new(UserId::new(), Role::Manager)
            .require_moderator()
            .is_err());
    }
}
