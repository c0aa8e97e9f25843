//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("⏳ Please wait {remaining} seconds before using this command again.")]
    CooldownActive { remaining: u64 },

    #[error("{0}")]
    RoleBoundary(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Plugin load error: {0}")]
    PluginLoad(String),

    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Remaining whole seconds if this is an active cooldown
    pub fn cooldown_remaining(&self) -> Option<u64> {
        match self {
            BotError::CooldownActive { remaining } => Some(*remaining),
            _ => None,
        }
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
