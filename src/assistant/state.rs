//! Assistant state and conversation log types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the assistant is doing right now
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssistantState {
    /// Not capturing a command (may still be passively listening)
    #[default]
    Idle,
    /// Wake word heard; capturing the command
    Listening,
    /// Resolving a command
    Processing,
    /// Speaking a response
    Speaking,
}

impl std::fmt::Display for AssistantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Listening => "LISTENING",
            Self::Processing => "PROCESSING",
            Self::Speaking => "SPEAKING",
        };
        f.write_str(name)
    }
}

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person talking to the assistant
    User,
    /// The assistant
    Assistant,
}

/// One entry in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID (UUID v4)
    pub id: String,
    /// Message text as heard or spoken
    pub text: String,
    /// Author
    pub sender: Sender,
    /// Local time the message was logged
    pub timestamp: DateTime<Local>,
}

impl Message {
    /// Create a message stamped with the current time
    #[must_use]
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Local::now(),
        }
    }
}

/// Everything a front-end needs to render the assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Current assistant state
    pub state: AssistantState,
    /// Master switch
    pub active: bool,
    /// False once the microphone permission was denied
    pub permission_granted: bool,
    /// Last known connectivity
    pub online: bool,
    /// In-progress transcript
    pub transcript: String,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            state: AssistantState::Idle,
            active: false,
            permission_granted: true,
            online: true,
            transcript: String::new(),
        }
    }
}
