//! relaybot - a plugin-driven chat-automation bot.
//!
//! The core is an event loop that takes inbound messages from a transport,
//! routes them through permission and cooldown gates to dynamically loaded
//! command plugins, fans passive events out to hook subscribers, and
//! supports hot-reloading plugins without a restart.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod plugins;
