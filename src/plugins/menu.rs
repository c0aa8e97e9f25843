//! Menu plugin - lists commands grouped by category

use std::fmt::Write as _;
use std::sync::Arc;

use crate::infrastructure::plugins::{command_fn, CommandSpec, PluginDescriptor, PluginRegistry};

pub fn descriptor(registry: Arc<PluginRegistry>) -> PluginDescriptor {
    let run = command_fn(move |params| {
        let registry = registry.clone();
        async move {
            let mut text = format!("📋 *{}* commands\n", params.config.bot.name);
            for category in registry.categories() {
                let _ = writeln!(text, "\n*{}*", category);
                for plugin in registry.by_category(&category) {
                    let Some(cmd) = &plugin.command else { continue };
                    let marker = if plugin.is_enabled() { "" } else { " (disabled)" };
                    let _ = writeln!(
                        text,
                        "  {}{} - {}{}",
                        params.config.bot.prefix, cmd.pattern, cmd.description, marker
                    );
                }
            }
            params
                .transport
                .send_text(&params.message.chat_id, text.trim_end())
                .await?;
            Ok(())
        }
    });

    PluginDescriptor::new()
        .with_name("menu")
        .with_command(
            CommandSpec::new("menu", run)
                .with_description("List available commands")
                .with_category("core"),
        )
        .with_alias("help")
}
