//! Per-(user, command) cooldown tracking

use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;

use crate::application::errors::BotError;

#[derive(Clone)]
struct CooldownEntry {
    at: Instant,
    ttl: Duration,
}

/// Each entry self-evicts `cooldown` seconds after it was written, so no
/// manual sweep is needed.
struct PerEntryExpiry;

impl Expiry<(String, String), CooldownEntry> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &(String, String),
        value: &CooldownEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Tracks the last invocation timestamp per (user, command) and answers
/// "is this invocation allowed now".
pub struct CooldownTracker {
    cooldowns: Cache<(String, String), CooldownEntry>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self {
            cooldowns: Cache::builder()
                .max_capacity(100_000)
                .expire_after(PerEntryExpiry)
                .build(),
        }
    }

    /// Check whether `user_id` may invoke `command` now.
    ///
    /// A passing check unconditionally refreshes the timestamp, so the
    /// window restarts on every allowed attempt whether or not the command
    /// later succeeds. A failing check leaves the existing timestamp alone.
    /// `cooldown_seconds == 0` bypasses the tracker entirely.
    pub fn check(
        &self,
        user_id: &str,
        command: &str,
        cooldown_seconds: u64,
    ) -> Result<(), BotError> {
        self.check_at(user_id, command, cooldown_seconds, Instant::now())
    }

    /// Clock-injected form of `check`, used directly by tests
    pub fn check_at(
        &self,
        user_id: &str,
        command: &str,
        cooldown_seconds: u64,
        now: Instant,
    ) -> Result<(), BotError> {
        if cooldown_seconds == 0 {
            return Ok(());
        }

        let key = (user_id.to_string(), command.to_string());

        if let Some(entry) = self.cooldowns.get(&key) {
            let deadline = entry.at + Duration::from_secs(cooldown_seconds);
            if now < deadline {
                // Round a fractional second up so an active cooldown never
                // reports zero remaining.
                let remaining = (deadline - now).as_secs_f64().ceil() as u64;
                return Err(BotError::CooldownActive {
                    remaining: remaining.max(1),
                });
            }
        }

        self.cooldowns.insert(
            key,
            CooldownEntry {
                at: now,
                ttl: Duration::from_secs(cooldown_seconds),
            },
        );

        Ok(())
    }

    /// Remaining whole seconds for a (user, command) pair, 0 if none
    pub fn remaining(&self, user_id: &str, command: &str, cooldown_seconds: u64) -> u64 {
        let key = (user_id.to_string(), command.to_string());
        let Some(entry) = self.cooldowns.get(&key) else {
            return 0;
        };
        let deadline = entry.at + Duration::from_secs(cooldown_seconds);
        let now = Instant::now();
        if now >= deadline {
            return 0;
        }
        (deadline - now).as_secs_f64().ceil() as u64
    }

    /// Clear the cooldown for a (user, command) pair
    pub fn reset(&self, user_id: &str, command: &str) {
        self.cooldowns
            .invalidate(&(user_id.to_string(), command.to_string()));
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}
