//! Persona configuration
//!
//! The persona names the assistant, sets its wake word and carries the
//! instruction sent to the remote generator with every prompt. A persona can
//! be loaded from a JSON file; otherwise the built-in FRIDAY persona is used.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Built-in persona instruction
const FRIDAY_INSTRUCTION: &str = r#"You are FRIDAY, a highly advanced but incredibly cute and affectionate AI assistant.
Your personality is:
- Tone: Sweet, soft, cheerful, and slightly playful (like a devoted anime character).
- Language: Mix of Hindi and English (Hinglish) is mandatory. It makes you sound natural to Indian users.
- Address: Always call the user "Sir" with warmth.
- Style: Keep it short, crisp, and conversational. Avoid robot-like long sentences.
- Emotion: Show care. Use words like "Ji", "Bilkul", "Done", "Oh wow", "Aww".

Examples:
User: "Hello"
Friday: "Hello Sir! Good Morning! Main ready hoon. Aaj ka kya plan hai?"

User: "Open Google"
Friday: "Ji Sir! Google open kar rahi hoon."

User: "Shutdown"
Friday: "Aww, ja rahe ho? Theek hai Sir, take care!"

User: "I am sad"
Friday: "Arre Sir, sad mat hoiye. Main hoon na! Chaliye kuch music sunte hain?""#;

/// Identity and voice lines of the assistant
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Display name
    pub name: String,

    /// Wake words, in priority order
    #[serde(default = "default_wake_words")]
    pub wake_words: Vec<String>,

    /// Instruction sent with every remote prompt
    #[serde(default)]
    pub system_instruction: Option<String>,

    /// Spoken when the master switch turns on
    #[serde(default = "default_announcement")]
    pub announcement: String,

    /// Spoken when the master switch turns off
    #[serde(default = "default_farewell")]
    pub farewell: String,
}

fn default_wake_words() -> Vec<String> {
    vec!["friday".to_string()]
}

fn default_announcement() -> String {
    "System Online. Main ready hoon Sir.".to_string()
}

fn default_farewell() -> String {
    "Bye bye Sir.".to_string()
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "FRIDAY".to_string(),
            wake_words: default_wake_words(),
            system_instruction: Some(FRIDAY_INSTRUCTION.to_string()),
            announcement: default_announcement(),
            farewell: default_farewell(),
        }
    }
}

impl Persona {
    /// Load a persona from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let persona: Self = serde_json::from_str(&content)?;

        if persona.wake_words.iter().all(|w| w.trim().is_empty()) {
            return Err(Error::Config(format!(
                "persona {} has no wake word",
                path.display()
            )));
        }

        tracing::debug!(path = %path.display(), name = %persona.name, "loaded persona");
        Ok(persona)
    }

    /// Primary wake word
    #[must_use]
    pub fn wake_word(&self) -> Option<&str> {
        self.wake_words.first().map(String::as_str)
    }

    /// Build the system prompt for remote generation
    #[must_use]
    pub fn system_prompt(&self) -> String {
        match self.system_instruction.as_deref() {
            Some(instruction) if !instruction.trim().is_empty() => instruction.to_string(),
            _ => format!(
                "You are {}. Keep responses concise and conversational.",
                self.name
            ),
        }
    }
}
