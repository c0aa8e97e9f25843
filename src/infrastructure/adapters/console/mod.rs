//! Console adapter - dev-mode transport printing to stdout

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::errors::BotError;
use crate::domain::traits::Transport;

/// Transport that echoes outbound traffic to the terminal. Used when no
/// real messaging platform is configured.
pub struct ConsoleAdapter;

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ConsoleAdapter {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        println!("[{}] {}", chat_id, text);
        Ok(Uuid::new_v4().to_string())
    }

    async fn react(&self, chat_id: &str, glyph: &str, message_id: &str) -> Result<(), BotError> {
        println!("[{}] reacted {} to {}", chat_id, glyph, message_id);
        Ok(())
    }
}
