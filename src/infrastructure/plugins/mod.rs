//! Plugin system: descriptor normalization, registry, loader, and the
//! cooldown/permission gates the dispatcher composes.

pub mod cooldown;
pub mod loader;
pub mod permission;
pub mod record;
pub mod registry;

pub use cooldown::CooldownTracker;
pub use loader::{PluginLoader, PluginEntryFn, PLUGIN_ENTRY_SYMBOL};
pub use permission::PermissionEvaluator;
pub use record::{
    command_fn, hook_fn, init_fn, CommandParams, CommandSpec, Hook, HookEvent, HookParams,
    InitParams, PluginContext, PluginDescriptor, PluginRecord,
};
pub use registry::PluginRegistry;
