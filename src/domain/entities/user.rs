use std::fmt;
use std::str::FromStr;

use crate::application::errors::BotError;

/// Represents a user as seen by the transport
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Fixed permission hierarchy, lowest to highest.
///
/// The derived `Ord` follows declaration order, so rank comparisons
/// can use `>=` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    User,
    Vip,
    Mod,
    Admin,
    Owner,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::User, Role::Vip, Role::Mod, Role::Admin, Role::Owner];

    /// Integer rank, 1-based (higher = more permissions)
    pub fn rank(self) -> u8 {
        self as u8 + 1
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Vip => "vip",
            Role::Mod => "mod",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// The role one rank above, if any
    pub fn next(self) -> Option<Role> {
        Role::ALL.get(self as usize + 1).copied()
    }

    /// The role one rank below, if any
    pub fn prev(self) -> Option<Role> {
        (self as usize).checked_sub(1).map(|i| Role::ALL[i])
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "vip" => Ok(Role::Vip),
            "mod" => Ok(Role::Mod),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(BotError::InvalidRole(other.to_string())),
        }
    }
}
