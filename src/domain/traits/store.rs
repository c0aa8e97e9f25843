use crate::application::errors::StorageError;
use crate::domain::entities::Role;

/// UserStore trait - abstraction for role/ban persistence.
///
/// Thin CRUD only; the permission evaluator layers the actual policy
/// (owner bypass, hierarchy comparison) on top of this.
pub trait UserStore: Send + Sync {
    /// Stored role for a user, `None` if the user is unknown
    fn role_of(&self, user_id: &str) -> Result<Option<Role>, StorageError>;

    fn set_role(&self, user_id: &str, role: Role) -> Result<(), StorageError>;

    fn is_banned(&self, user_id: &str) -> Result<bool, StorageError>;

    fn set_banned(&self, user_id: &str, banned: bool) -> Result<(), StorageError>;
}
