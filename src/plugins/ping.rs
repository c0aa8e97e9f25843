//! Ping plugin - latency check

use chrono::Utc;

use crate::infrastructure::plugins::{command_fn, CommandSpec, PluginDescriptor};

pub fn descriptor() -> PluginDescriptor {
    let run = command_fn(|params| async move {
        let latency = Utc::now()
            .signed_duration_since(params.message.timestamp)
            .num_milliseconds();
        let text = format!("🏓 Pong! {}ms", latency.max(0));
        params
            .transport
            .send_text(&params.message.chat_id, &text)
            .await?;
        Ok(())
    });

    PluginDescriptor::new()
        .with_name("ping")
        .with_command(
            CommandSpec::new("ping", run)
                .with_description("Check bot responsiveness")
                .with_category("core")
                .with_react("⚡"),
        )
        .with_alias("p")
}
