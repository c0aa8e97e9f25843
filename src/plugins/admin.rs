//! Plugin admin command - owner-only lifecycle control from chat

use std::sync::Arc;

use crate::application::errors::BotError;
use crate::domain::entities::Role;
use crate::infrastructure::plugins::{
    command_fn, CommandSpec, PluginDescriptor, PluginLoader,
};

const USAGE: &str = "Usage: plugin <list|enable|disable|reload|unload> [name]";

pub fn descriptor(loader: Arc<PluginLoader>) -> PluginDescriptor {
    let run = command_fn(move |params| {
        let loader = loader.clone();
        async move {
            let action = params
                .args
                .first()
                .map(String::as_str)
                .ok_or_else(|| BotError::Validation(USAGE.to_string()))?;

            let reply = match action {
                "list" => {
                    let mut lines: Vec<String> = loader
                        .registry()
                        .all()
                        .iter()
                        .map(|p| {
                            format!(
                                "{} [{}]{}",
                                p.name,
                                p.category,
                                if p.is_enabled() { "" } else { " (disabled)" }
                            )
                        })
                        .collect();
                    lines.sort();
                    format!("Loaded plugins:\n{}", lines.join("\n"))
                }
                "enable" | "disable" | "reload" | "unload" => {
                    let name = params
                        .args
                        .get(1)
                        .ok_or_else(|| BotError::Validation(USAGE.to_string()))?;

                    match action {
                        "enable" => {
                            loader.registry().set_enabled(name, true)?;
                            format!("✅ Enabled plugin: {}", name)
                        }
                        "disable" => {
                            loader.registry().set_enabled(name, false)?;
                            format!("⏸️ Disabled plugin: {}", name)
                        }
                        "reload" => {
                            loader.reload(name).await?;
                            format!("🔄 Reloaded plugin: {}", name)
                        }
                        _ => {
                            if loader.unload(name) {
                                format!("🗑️ Unloaded plugin: {}", name)
                            } else {
                                return Err(BotError::NotFound(format!("plugin '{}'", name)));
                            }
                        }
                    }
                }
                _ => return Err(BotError::Validation(USAGE.to_string())),
            };

            params
                .transport
                .send_text(&params.message.chat_id, &reply)
                .await?;
            Ok(())
        }
    });

    PluginDescriptor::new()
        .with_name("plugin-admin")
        .with_command(
            CommandSpec::new("plugin", run)
                .with_description("Manage loaded plugins")
                .with_category("core"),
        )
        .with_permission(Role::Owner)
}
