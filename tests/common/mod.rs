#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;

use relaybot::application::errors::BotError;
use relaybot::domain::entities::{Message, User};
use relaybot::domain::traits::Transport;

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Transport that records outbound traffic for assertions
#[derive(Default)]
pub struct RecordingTransport {
    pub sent: Mutex<Vec<(String, String)>>,
    pub reactions: Mutex<Vec<(String, String)>>,
    pub fail_reactions: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variant whose `react` always fails, for best-effort checks
    pub fn with_failing_reactions() -> Self {
        Self {
            fail_reactions: true,
            ..Self::default()
        }
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn reaction_count(&self) -> usize {
        self.reactions.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<String, BotError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(format!("sent-{}", self.sent.lock().unwrap().len()))
    }

    async fn react(&self, _chat_id: &str, glyph: &str, message_id: &str) -> Result<(), BotError> {
        if self.fail_reactions {
            return Err(BotError::Transport("reaction rejected".to_string()));
        }
        self.reactions
            .lock()
            .unwrap()
            .push((glyph.to_string(), message_id.to_string()));
        Ok(())
    }
}

pub fn transport() -> (Arc<RecordingTransport>, Arc<dyn Transport>) {
    let recording = Arc::new(RecordingTransport::new());
    let dyn_transport: Arc<dyn Transport> = recording.clone();
    (recording, dyn_transport)
}

pub fn message_from(sender: &str, text: &str) -> Message {
    Message::new("chat-1", User::new(sender), text)
}
