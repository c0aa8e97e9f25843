//! Role-based permission evaluation

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::errors::BotError;
use crate::domain::entities::Role;
use crate::domain::traits::UserStore;

/// Decides whether a caller satisfies a required role.
///
/// Owner identity is structural (identity match against the configured owner
/// identifier), not a role-store lookup, and is evaluated before the ban
/// check, so the configured owner can never lock themselves out.
pub struct PermissionEvaluator {
    /// Normalized owner identifier, if configured
    owner: Option<String>,
    store: Arc<dyn UserStore>,
}

impl PermissionEvaluator {
    pub fn new(owner_number: &str, store: Arc<dyn UserStore>) -> Self {
        let owner = if owner_number.is_empty() {
            None
        } else {
            Some(normalize_identity(owner_number).to_string())
        };
        Self { owner, store }
    }

    /// Whether `user_id` is the configured owner
    pub fn is_owner(&self, user_id: &str) -> bool {
        match &self.owner {
            Some(owner) => normalize_identity(user_id) == owner,
            None => false,
        }
    }

    /// Check whether a user satisfies `required`. Never errors: store
    /// failures degrade to the lowest role rather than blocking dispatch.
    pub fn check_permission(&self, user_id: &str, required: Role) -> bool {
        if self.is_owner(user_id) {
            return true;
        }

        match self.store.is_banned(user_id) {
            Ok(true) => {
                warn!(user = %user_id, "banned user attempted command");
                return false;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(user = %user_id, error = %e, "ban lookup failed, treating as not banned");
            }
        }

        self.role_of(user_id) >= required
    }

    /// Effective role of a user (owner identity wins over the store)
    pub fn role_of(&self, user_id: &str) -> Role {
        if self.is_owner(user_id) {
            return Role::Owner;
        }
        match self.store.role_of(user_id) {
            Ok(role) => role.unwrap_or_default(),
            Err(e) => {
                warn!(user = %user_id, error = %e, "role lookup failed, defaulting");
                Role::default()
            }
        }
    }

    /// Assign a role by name; unknown names are rejected
    pub fn set_user_role(&self, user_id: &str, role: &str) -> Result<Role, BotError> {
        let role: Role = role.parse()?;
        self.store.set_role(user_id, role)?;
        info!(user = %user_id, role = %role, "user role updated");
        Ok(role)
    }

    /// Move a user exactly one rank up
    pub fn promote(&self, user_id: &str) -> Result<Role, BotError> {
        let current = self.role_of(user_id);
        let next = current
            .next()
            .ok_or_else(|| BotError::RoleBoundary("user is already at maximum role".to_string()))?;
        self.store.set_role(user_id, next)?;
        info!(user = %user_id, role = %next, "user promoted");
        Ok(next)
    }

    /// Move a user exactly one rank down
    pub fn demote(&self, user_id: &str) -> Result<Role, BotError> {
        let current = self.role_of(user_id);
        let prev = current
            .prev()
            .ok_or_else(|| BotError::RoleBoundary("user is already at minimum role".to_string()))?;
        self.store.set_role(user_id, prev)?;
        info!(user = %user_id, role = %prev, "user demoted");
        Ok(prev)
    }

    pub fn roles(&self) -> &'static [Role] {
        &Role::ALL
    }
}

/// Identity part before the transport suffix (phone number before `@`)
fn normalize_identity(id: &str) -> &str {
    id.split('@').next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::MemoryUserStore;

    fn evaluator(owner: &str) -> (PermissionEvaluator, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        (PermissionEvaluator::new(owner, store.clone()), store)
    }

    #[test]
    fn owner_matches_with_or_without_suffix() {
        let (eval, _) = evaluator("15550001111@s.whatsapp.net");
        assert!(eval.is_owner("15550001111"));
        assert!(eval.is_owner("15550001111@s.whatsapp.net"));
        assert!(!eval.is_owner("15550002222"));
    }

    #[test]
    fn no_owner_configured_means_no_bypass() {
        let (eval, _) = evaluator("");
        assert!(!eval.is_owner("15550001111"));
        assert!(!eval.check_permission("15550001111", Role::Admin));
    }

    #[test]
    fn owner_bypass_beats_ban() {
        let (eval, store) = evaluator("15550001111");
        store.set_banned("15550001111", true).unwrap();
        assert!(eval.check_permission("15550001111@s.whatsapp.net", Role::Owner));
    }

    #[test]
    fn banned_user_fails_every_check() {
        let (eval, store) = evaluator("15550001111");
        store.set_role("u1", Role::Admin).unwrap();
        store.set_banned("u1", true).unwrap();
        assert!(!eval.check_permission("u1", Role::User));
    }

    #[test]
    fn rank_comparison() {
        let (eval, store) = evaluator("15550001111");
        store.set_role("u1", Role::Mod).unwrap();
        assert!(eval.check_permission("u1", Role::Vip));
        assert!(eval.check_permission("u1", Role::Mod));
        assert!(!eval.check_permission("u1", Role::Admin));
        // Unknown users default to the lowest role
        assert!(eval.check_permission("stranger", Role::User));
        assert!(!eval.check_permission("stranger", Role::Vip));
    }

    #[test]
    fn set_user_role_rejects_unknown_names() {
        let (eval, _) = evaluator("");
        assert!(matches!(
            eval.set_user_role("u1", "wizard"),
            Err(BotError::InvalidRole(_))
        ));
        assert_eq!(eval.set_user_role("u1", "vip").unwrap(), Role::Vip);
    }

    #[test]
    fn promote_and_demote_hit_boundaries() {
        let (eval, store) = evaluator("");
        assert_eq!(eval.promote("u1").unwrap(), Role::Vip);
        assert_eq!(eval.promote("u1").unwrap(), Role::Mod);

        store.set_role("u2", Role::Owner).unwrap();
        assert!(matches!(eval.promote("u2"), Err(BotError::RoleBoundary(_))));

        assert!(matches!(eval.demote("u3"), Err(BotError::RoleBoundary(_))));
    }
}
