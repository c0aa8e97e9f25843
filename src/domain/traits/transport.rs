use async_trait::async_trait;

use crate::application::errors::BotError;

/// Transport trait - abstraction for messaging platform adapters.
///
/// The core only ever needs two outbound primitives; everything else the
/// platform offers stays behind the adapter.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a text message to a chat, returning the sent message's id
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<String, BotError>;

    /// React to a message with an emoji glyph
    async fn react(&self, chat_id: &str, glyph: &str, message_id: &str) -> Result<(), BotError>;
}
