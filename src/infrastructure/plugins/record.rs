//! Plugin descriptor and the normalized internal record

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::application::errors::BotError;
use crate::domain::entities::{Message, Role};
use crate::domain::traits::Transport;
use crate::infrastructure::config::Config;

/// Future type returned by all plugin handlers
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), BotError>> + Send>>;

/// Command handler function type
pub type CommandFn = Arc<dyn Fn(CommandParams) -> HandlerFuture + Send + Sync>;

/// Passive hook handler function type
pub type HookFn = Arc<dyn Fn(HookParams) -> HandlerFuture + Send + Sync>;

/// One-shot initialization hook function type
pub type InitFn = Arc<dyn Fn(InitParams) -> HandlerFuture + Send + Sync>;

/// Per-plugin mutable state, owned exclusively by one plugin for the
/// lifetime of its load. Never shared between plugins.
pub type PluginContext = Arc<Mutex<serde_json::Map<String, serde_json::Value>>>;

/// Wrap an async closure into a [`CommandFn`]
pub fn command_fn<F, Fut>(f: F) -> CommandFn
where
    F: Fn(CommandParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BotError>> + Send + 'static,
{
    Arc::new(move |params| Box::pin(f(params)))
}

/// Wrap an async closure into a [`HookFn`]
pub fn hook_fn<F, Fut>(f: F) -> HookFn
where
    F: Fn(HookParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BotError>> + Send + 'static,
{
    Arc::new(move |params| Box::pin(f(params)))
}

/// Wrap an async closure into an [`InitFn`]
pub fn init_fn<F, Fut>(f: F) -> InitFn
where
    F: Fn(InitParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BotError>> + Send + 'static,
{
    Arc::new(move |params| Box::pin(f(params)))
}

/// Parameter bundle passed to a command's `run`
pub struct CommandParams {
    pub transport: Arc<dyn Transport>,
    pub message: Message,
    pub args: Vec<String>,
    pub context: PluginContext,
    pub config: Arc<Config>,
}

/// Parameter bundle passed to a passive hook
pub struct HookParams {
    pub transport: Arc<dyn Transport>,
    pub event: HookEvent,
    pub context: PluginContext,
    pub config: Arc<Config>,
}

/// Parameter bundle passed to a plugin's init hook
pub struct InitParams {
    pub context: PluginContext,
    pub config: Arc<Config>,
}

/// Passive event categories a plugin may subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Message,
    Presence,
    GroupUpdate,
    Status,
    Call,
}

impl Hook {
    pub fn as_str(self) -> &'static str {
        match self {
            Hook::Message => "on_message",
            Hook::Presence => "on_presence",
            Hook::GroupUpdate => "on_group_update",
            Hook::Status => "on_status",
            Hook::Call => "on_call",
        }
    }
}

/// Payload fanned out to hook subscribers
#[derive(Debug, Clone)]
pub struct HookEvent {
    pub hook: Hook,
    /// Present for message-shaped events
    pub message: Option<Message>,
    /// Raw transport payload for everything else
    pub data: serde_json::Value,
}

impl HookEvent {
    pub fn message(message: Message) -> Self {
        Self {
            hook: Hook::Message,
            message: Some(message),
            data: serde_json::Value::Null,
        }
    }

    pub fn raw(hook: Hook, data: serde_json::Value) -> Self {
        Self {
            hook,
            message: None,
            data,
        }
    }
}

/// The command-handler part of a plugin
#[derive(Clone)]
pub struct CommandSpec {
    /// Primary invocation keyword, lowercase-normalized at registration
    pub pattern: String,
    pub description: String,
    pub category: String,
    /// Reaction glyph sent best-effort before `run`
    pub react: Option<String>,
    pub run: CommandFn,
}

impl CommandSpec {
    pub fn new(pattern: impl Into<String>, run: CommandFn) -> Self {
        Self {
            pattern: pattern.into(),
            description: String::new(),
            category: "general".to_string(),
            react: None,
            run,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_react(mut self, glyph: impl Into<String>) -> Self {
        self.react = Some(glyph.into());
        self
    }
}

/// The shape a plugin module exports: everything optional, normalized by
/// the loader into a fully-populated [`PluginRecord`]. This is the sole
/// extension surface.
#[derive(Default)]
pub struct PluginDescriptor {
    pub name: Option<String>,
    pub command: Option<CommandSpec>,
    pub alias: Vec<String>,
    pub init: Option<InitFn>,
    pub on_message: Option<HookFn>,
    pub on_presence: Option<HookFn>,
    pub on_group_update: Option<HookFn>,
    pub on_status: Option<HookFn>,
    pub on_call: Option<HookFn>,
    pub permission: Option<Role>,
    pub cooldown: Option<u64>,
    pub enabled: Option<bool>,
    pub category: Option<String>,
}

impl PluginDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_command(mut self, command: CommandSpec) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias.push(alias.into());
        self
    }

    pub fn with_init(mut self, init: InitFn) -> Self {
        self.init = Some(init);
        self
    }

    pub fn with_hook(mut self, hook: Hook, f: HookFn) -> Self {
        match hook {
            Hook::Message => self.on_message = Some(f),
            Hook::Presence => self.on_presence = Some(f),
            Hook::GroupUpdate => self.on_group_update = Some(f),
            Hook::Status => self.on_status = Some(f),
            Hook::Call => self.on_call = Some(f),
        }
        self
    }

    pub fn with_permission(mut self, role: Role) -> Self {
        self.permission = Some(role);
        self
    }

    pub fn with_cooldown(mut self, seconds: u64) -> Self {
        self.cooldown = Some(seconds);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = Some(false);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A fully-normalized, registered plugin. Every optional descriptor field
/// has been filled with its documented default; nothing unset leaks past
/// the loader boundary.
pub struct PluginRecord {
    pub name: String,
    pub command: Option<CommandSpec>,
    pub aliases: Vec<String>,
    pub init: Option<InitFn>,
    hooks: HashMap<Hook, HookFn>,
    pub permission: Role,
    /// 0 disables cooldown enforcement
    pub cooldown: u64,
    enabled: AtomicBool,
    pub category: String,
    /// File the plugin was loaded from; `None` for builtins (not reloadable)
    pub source: Option<PathBuf>,
    /// Monotonic load generation; each (re)load of a source produces a new one
    pub generation: u64,
    pub context: PluginContext,
}

impl PluginRecord {
    /// Normalize a descriptor into a record.
    ///
    /// Defaults: name falls back to the source file stem; missing aliases
    /// become empty; missing hooks stay absent; permission defaults to the
    /// lowest role; cooldown to 0; enabled to true; category to the command's
    /// own category, then "general".
    pub fn from_descriptor(
        desc: PluginDescriptor,
        source: Option<&Path>,
        generation: u64,
    ) -> Result<Self, BotError> {
        let name = desc
            .name
            .or_else(|| {
                source
                    .and_then(|p| p.file_stem())
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .ok_or_else(|| BotError::PluginLoad("plugin has no name".to_string()))?;

        let category = desc
            .category
            .or_else(|| desc.command.as_ref().map(|c| c.category.clone()))
            .unwrap_or_else(|| "general".to_string());

        let mut hooks = HashMap::new();
        for (hook, f) in [
            (Hook::Message, desc.on_message),
            (Hook::Presence, desc.on_presence),
            (Hook::GroupUpdate, desc.on_group_update),
            (Hook::Status, desc.on_status),
            (Hook::Call, desc.on_call),
        ] {
            if let Some(f) = f {
                hooks.insert(hook, f);
            }
        }

        Ok(Self {
            name,
            command: desc.command,
            aliases: desc.alias,
            init: desc.init,
            hooks,
            permission: desc.permission.unwrap_or_default(),
            cooldown: desc.cooldown.unwrap_or(0),
            enabled: AtomicBool::new(desc.enabled.unwrap_or(true)),
            category,
            source: source.map(Path::to_path_buf),
            generation,
            context: Arc::new(Mutex::new(serde_json::Map::new())),
        })
    }

    pub fn hook(&self, hook: Hook) -> Option<&HookFn> {
        self.hooks.get(&hook)
    }

    pub fn has_hook(&self, hook: Hook) -> bool {
        self.hooks.contains_key(&hook)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Every keyword this record answers to (pattern first, then aliases),
    /// lowercase-normalized
    pub fn keywords(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(cmd) = &self.command {
            keys.push(cmd.pattern.to_lowercase());
        }
        keys.extend(self.aliases.iter().map(|a| a.to_lowercase()));
        keys
    }
}
