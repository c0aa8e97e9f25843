use super::User;
use chrono::{DateTime, Utc};

/// An inbound message as the core sees it.
///
/// The transport payload is opaque beyond four things: a stable message
/// identifier, the chat it arrived in, who sent it, and best-effort
/// plaintext content. Anything else rides along in `raw`.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender: User,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub raw: Option<serde_json::Value>,
}

impl Message {
    pub fn new(chat_id: impl Into<String>, sender: User, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.into(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            raw: None,
        }
    }

    /// Override the generated id with the transport's stable one
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}
