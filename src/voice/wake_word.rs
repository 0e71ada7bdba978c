//! Wake word classification
//!
//! Decides whether a finished utterance was addressed to the assistant and,
//! if so, strips the wake word to produce the command body.
//!
//! Matching is a plain substring search on the lowercased text, not a word
//! boundary match: "fridays" also triggers "friday".

use crate::{Error, Result};

/// Outcome of classifying an utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No wake word present; the utterance is ambient speech
    NotMatched,
    /// Wake word present; holds the lowercased, stripped, trimmed command body
    ///
    /// An empty body is a bare invocation ("friday").
    Matched(String),
}

impl Classification {
    /// Command body, if the wake word matched
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::NotMatched => None,
            Self::Matched(body) => Some(body),
        }
    }
}

/// Classifies transcripts against a set of wake words
#[derive(Debug, Clone)]
pub struct WakeWordDetector {
    wake_words: Vec<String>,
}

impl WakeWordDetector {
    /// Create a new detector
    ///
    /// # Arguments
    ///
    /// * `wake_words` - Wake words in priority order (e.g., "friday")
    ///
    /// # Errors
    ///
    /// Returns error if no usable wake word is given
    pub fn new(wake_words: Vec<String>) -> Result<Self> {
        let normalized: Vec<String> = wake_words
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        if normalized.is_empty() {
            return Err(Error::Config("at least one wake word is required".to_string()));
        }

        tracing::debug!(wake_words = ?normalized, "wake word detector initialized");

        Ok(Self {
            wake_words: normalized,
        })
    }

    /// Check whether a (possibly partial) transcript contains a wake word
    #[must_use]
    pub fn contains_wake_word(&self, transcript: &str) -> bool {
        let normalized = transcript.to_lowercase();
        self.wake_words.iter().any(|w| normalized.contains(w.as_str()))
    }

    /// Classify a finished utterance
    ///
    /// Only the first occurrence of the wake word is removed.
    #[must_use]
    pub fn classify(&self, transcript: &str) -> Classification {
        let normalized = transcript.to_lowercase();

        for wake_word in &self.wake_words {
            if let Some(pos) = normalized.find(wake_word.as_str()) {
                let mut body = String::with_capacity(normalized.len() - wake_word.len());
                body.push_str(&normalized[..pos]);
                body.push_str(&normalized[pos + wake_word.len()..]);

                let body = body.trim().to_string();
                tracing::info!(wake_word, command = %body, "wake word detected");
                return Classification::Matched(body);
            }
        }

        Classification::NotMatched
    }

    /// Get the configured wake words
    #[must_use]
    pub fn wake_words(&self) -> &[String] {
        &self.wake_words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn friday() -> WakeWordDetector {
        WakeWordDetector::new(vec!["friday".to_string()]).unwrap()
    }

    #[test]
    fn test_requires_wake_word() {
        assert!(WakeWordDetector::new(vec!["   ".to_string()]).is_err());
        assert!(WakeWordDetector::new(Vec::new()).is_err());
    }

    #[test]
    fn test_strips_first_occurrence_only() {
        let detector = friday();
        assert_eq!(
            detector.classify("Friday tell friday a joke"),
            Classification::Matched("tell friday a joke".to_string())
        );
    }

    #[test]
    fn test_wake_word_in_middle() {
        let detector = friday();
        assert_eq!(
            detector.classify("open youtube friday"),
            Classification::Matched("open youtube".to_string())
        );
    }

    #[test]
    fn test_substring_match_is_accepted() {
        let detector = friday();
        assert_eq!(
            detector.classify("fridays are great"),
            Classification::Matched("s are great".to_string())
        );
    }

    #[test]
    fn test_bare_invocation() {
        let detector = friday();
        let result = detector.classify("  FRIDAY  ");
        assert_eq!(result, Classification::Matched(String::new()));
        assert_eq!(result.command(), Some(""));
    }

    #[test]
    fn test_not_matched() {
        let detector = friday();
        assert_eq!(detector.classify("what time is it"), Classification::NotMatched);
        assert!(detector.classify("").command().is_none());
    }
}
