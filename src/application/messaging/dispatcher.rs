//! Dispatcher - routes inbound events to command handlers and hooks

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::{debug, error, info, warn};

use crate::application::errors::BotError;
use crate::domain::entities::Message;
use crate::domain::traits::Transport;
use crate::infrastructure::config::Config;
use crate::infrastructure::plugins::{
    CommandParams, CooldownTracker, HookEvent, HookParams, PermissionEvaluator, PluginRegistry,
};
use super::parser::MessageParser;

/// Identifier-keyed, time-bounded "seen" set absorbing transport-level
/// redelivery before any routing happens
pub struct DedupWindow {
    seen: Cache<String, ()>,
}

impl DedupWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            seen: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(window)
                .build(),
        }
    }

    /// Returns true on first sighting of `id` within the window
    pub fn first_sighting(&self, id: &str) -> bool {
        self.seen.entry(id.to_string()).or_insert(()).is_fresh()
    }
}

/// The orchestration core: resolves inbound events to plugins, enforces the
/// permission and cooldown gates, invokes handlers, and isolates failures.
pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
    permissions: PermissionEvaluator,
    cooldowns: CooldownTracker,
    parser: MessageParser,
    seen: DedupWindow,
    config: Arc<Config>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<PluginRegistry>,
        permissions: PermissionEvaluator,
        config: Arc<Config>,
    ) -> Self {
        let parser = MessageParser::new(&config.bot.prefix);
        let seen = DedupWindow::new(Duration::from_secs(config.limits.dedup_window_seconds));
        Self {
            registry,
            permissions,
            cooldowns: CooldownTracker::new(),
            parser,
            seen,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn permissions(&self) -> &PermissionEvaluator {
        &self.permissions
    }

    /// Entry point for one inbound transport event: absorb duplicates,
    /// route a command invocation if the text is prefixed, then fan the
    /// message out to `on_message` subscribers.
    pub async fn handle_inbound(
        &self,
        transport: &Arc<dyn Transport>,
        message: Message,
    ) -> Result<bool, BotError> {
        if !self.seen.first_sighting(&message.id) {
            debug!(message = %message.id, "duplicate inbound event dropped");
            return Ok(false);
        }

        let mut handled = false;
        if let Some((keyword, args)) = self.parser.parse_command(&message.text) {
            handled = self
                .execute_command(transport, &keyword, &message, args)
                .await?;
        }

        self.run_hook(transport, HookEvent::message(message)).await;
        Ok(handled)
    }

    /// Execute a command invocation.
    ///
    /// Returns `Ok(false)` for unknown and disabled keywords (the caller
    /// decides whether that is user-visible; by default it is a silent
    /// no-op). Permission, cooldown, and run failures are reported to the
    /// invoking user best-effort and then re-raised to the caller.
    pub async fn execute_command(
        &self,
        transport: &Arc<dyn Transport>,
        keyword: &str,
        message: &Message,
        args: Vec<String>,
    ) -> Result<bool, BotError> {
        let keyword = keyword.to_lowercase();

        let Some(plugin) = self.registry.find_by_command(&keyword) else {
            return Ok(false);
        };

        // Disabled plugins stay in the command index for introspection but
        // are invisible to invocation.
        if !plugin.is_enabled() {
            debug!(plugin = %plugin.name, "plugin is disabled");
            return Ok(false);
        }

        let Some(spec) = plugin.command.clone() else {
            return Ok(false);
        };

        let user = &message.sender.id;

        let result = async {
            if !self.permissions.check_permission(user, plugin.permission) {
                return Err(BotError::PermissionDenied(format!(
                    "🔒 This command requires {} permission.",
                    plugin.permission
                )));
            }

            if plugin.cooldown > 0 {
                self.cooldowns.check(user, &keyword, plugin.cooldown)?;
            }

            // Best-effort reaction; a failed reaction never aborts the command.
            if let Some(glyph) = &spec.react {
                if let Err(e) = transport.react(&message.chat_id, glyph, &message.id).await {
                    warn!(plugin = %plugin.name, error = %e, "failed to send reaction");
                }
            }

            info!(plugin = %plugin.name, user = %user, command = %keyword, "executing plugin");

            let params = CommandParams {
                transport: Arc::clone(transport),
                message: message.clone(),
                args,
                context: plugin.context.clone(),
                config: self.config.clone(),
            };
            (spec.run)(params).await
        }
        .await;

        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                error!(plugin = %plugin.name, user = %user, error = %e, "error executing plugin");

                // The user always sees something before the error propagates.
                let text = format!("❌ {}", e);
                if let Err(send_err) = transport.send_text(&message.chat_id, &text).await {
                    warn!(error = %send_err, "failed to report error to user");
                }

                Err(e)
            }
        }
    }

    /// Fan an event out to every enabled plugin declaring the hook, in
    /// registration order. The plugin list is snapshotted up front, so
    /// registry mutation mid-flight does not disturb the pass; each hook is
    /// isolated, and one failure never stops the rest.
    pub async fn run_hook(&self, transport: &Arc<dyn Transport>, event: HookEvent) {
        for plugin in self.registry.all() {
            if !plugin.is_enabled() {
                continue;
            }
            let Some(handler) = plugin.hook(event.hook) else {
                continue;
            };

            let params = HookParams {
                transport: Arc::clone(transport),
                event: event.clone(),
                context: plugin.context.clone(),
                config: self.config.clone(),
            };

            if let Err(e) = handler(params).await {
                error!(
                    plugin = %plugin.name,
                    hook = %event.hook.as_str(),
                    error = %e,
                    "error in hook"
                );
            }
        }
    }

    /// Remaining cooldown for a user/command pair, for introspection commands
    pub fn cooldown_remaining(&self, user_id: &str, keyword: &str) -> u64 {
        let keyword = keyword.to_lowercase();
        match self.registry.find_by_command(&keyword) {
            Some(plugin) if plugin.cooldown > 0 => {
                self.cooldowns.remaining(user_id, &keyword, plugin.cooldown)
            }
            _ => 0,
        }
    }
}
