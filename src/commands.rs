//! Command resolution
//!
//! Maps a wake-word-stripped command body to a spoken reply and optional side
//! effects. Local rules are tried in order and the first match wins; anything
//! unmatched goes to the remote text generator. Every path ends in a
//! display-ready string: resolution never fails.

use std::sync::Arc;

use chrono::{DateTime, Local};
use url::Url;

use crate::actions::Action;
use crate::connectivity::Connectivity;
use crate::generation::TextGenerator;

/// Reply to a bare wake word
pub const GREETING_REPLY: &str = "Ji Sir?";

/// Reply when offline and no local rule matched
pub const OFFLINE_REPLY: &str =
    "Sir, abhi internet disconnected hai. Main sirf offline commands sun sakti hoon.";

/// Reply when remote generation failed
pub const CONNECTION_ERROR_REPLY: &str = "Connection error Sir. Please check internet.";

/// How a command body is tested against a rule
#[derive(Debug, Clone, Copy)]
enum Matcher {
    /// Body contains any of the phrases
    Contains(&'static [&'static str]),
    /// Body equals one of the phrases
    Exact(&'static [&'static str]),
}

impl Matcher {
    fn matches(self, body: &str) -> bool {
        match self {
            Self::Contains(phrases) => phrases.iter().any(|p| body.contains(p)),
            Self::Exact(phrases) => phrases.contains(&body),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Reply {
    Fixed(&'static str),
    Time,
    Date,
}

#[derive(Debug, Clone, Copy)]
enum Effect {
    None,
    OpenUrl(&'static str),
    Launch(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    matcher: Matcher,
    reply: Reply,
    effect: Effect,
}

/// Local command table; order matters, earlier rules shadow later ones
const RULES: &[Rule] = &[
    Rule {
        matcher: Matcher::Contains(&["open vs code", "visual studio code", "open code"]),
        reply: Reply::Fixed("Opening Visual Studio Code, Sir."),
        effect: Effect::Launch("vscode://"),
    },
    Rule {
        matcher: Matcher::Contains(&["open new tab"]),
        reply: Reply::Fixed("New tab open kar diya hai Sir."),
        effect: Effect::OpenUrl("https://google.com"),
    },
    Rule {
        matcher: Matcher::Contains(&["open spotify", "play music"]),
        reply: Reply::Fixed("Opening Spotify Sir, enjoy the music!"),
        effect: Effect::Launch("spotify:"),
    },
    Rule {
        matcher: Matcher::Contains(&["open settings", "system settings"]),
        reply: Reply::Fixed("Opening System Settings."),
        effect: Effect::Launch("ms-settings:"),
    },
    Rule {
        matcher: Matcher::Contains(&["open google"]),
        reply: Reply::Fixed("Ji Sir, Google open kar rahi hoon."),
        effect: Effect::OpenUrl("https://google.com"),
    },
    Rule {
        matcher: Matcher::Contains(&["open youtube"]),
        reply: Reply::Fixed("Youtube start kar diya, Sir."),
        effect: Effect::OpenUrl("https://youtube.com"),
    },
    Rule {
        matcher: Matcher::Contains(&["open github"]),
        reply: Reply::Fixed("GitHub opening now. Happy coding!"),
        effect: Effect::OpenUrl("https://github.com"),
    },
    Rule {
        matcher: Matcher::Contains(&["open stack overflow"]),
        reply: Reply::Fixed("Opening Stack Overflow."),
        effect: Effect::OpenUrl("https://stackoverflow.com"),
    },
    Rule {
        matcher: Matcher::Contains(&["time", "samay"]),
        reply: Reply::Time,
        effect: Effect::None,
    },
    Rule {
        matcher: Matcher::Contains(&["date", "tareekh"]),
        reply: Reply::Date,
        effect: Effect::None,
    },
    // Never executed, only declined
    Rule {
        matcher: Matcher::Contains(&["shutdown", "restart"]),
        reply: Reply::Fixed("Hardware access browser se allowed nahi hai Sir, sorry!"),
        effect: Effect::None,
    },
    Rule {
        matcher: Matcher::Contains(&["who are you", "tum kaun ho", "introduction"]),
        reply: Reply::Fixed(
            "Main FRIDAY hoon Sir. Aapki personal assistant. Offline bhi kaam kar sakti hoon!",
        ),
        effect: Effect::None,
    },
    Rule {
        matcher: Matcher::Contains(&["what can you do", "kya kar sakti ho"]),
        reply: Reply::Fixed(
            "Main apps open kar sakti hoon, time bata sakti hoon, aur hum baatein bhi kar sakte hain!",
        ),
        effect: Effect::None,
    },
    Rule {
        matcher: Matcher::Exact(&["hello", "hi", "hey", "namaste"]),
        reply: Reply::Fixed("Hello Sir! Kya haal hai?"),
        effect: Effect::None,
    },
];

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// Bare wake word
    Greeting,
    /// Local command table
    Local,
    /// Offline short-circuit
    Offline,
    /// Remote generator
    Remote,
    /// Remote generator failed
    RemoteFailed,
}

/// A resolved command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Text to display and speak
    pub text: String,
    /// Side effects to fire
    pub actions: Vec<Action>,
    /// Where the reply came from
    pub source: ReplySource,
}

impl Resolution {
    fn new(text: impl Into<String>, source: ReplySource) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
            source,
        }
    }
}

/// Resolves command bodies to replies
#[derive(Clone)]
pub struct CommandResolver {
    generator: Arc<dyn TextGenerator>,
    connectivity: Connectivity,
    clock: fn() -> DateTime<Local>,
}

impl CommandResolver {
    /// Create a resolver backed by `generator`
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, connectivity: Connectivity) -> Self {
        Self {
            generator,
            connectivity,
            clock: Local::now,
        }
    }

    /// Replace the clock used for time and date replies
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    /// Resolve a command body
    pub async fn resolve(&self, body: &str) -> Resolution {
        match self.resolve_local(body) {
            Some(resolution) => resolution,
            None => self.resolve_remote(body).await,
        }
    }

    /// Resolve without touching the network
    ///
    /// Returns `None` when only the remote generator can answer.
    #[must_use]
    pub fn resolve_local(&self, body: &str) -> Option<Resolution> {
        if body.is_empty() {
            return Some(Resolution::new(GREETING_REPLY, ReplySource::Greeting));
        }

        if let Some(rule) = RULES.iter().find(|r| r.matcher.matches(body)) {
            tracing::debug!(command = body, "matched local command");
            return Some(self.apply(rule));
        }

        if !self.connectivity.is_online() {
            tracing::info!(command = body, "offline, skipping remote generation");
            return Some(Resolution::new(OFFLINE_REPLY, ReplySource::Offline));
        }

        None
    }

    /// Ask the remote generator, mapping any failure to a fixed reply
    pub async fn resolve_remote(&self, body: &str) -> Resolution {
        match self.generator.generate(body).await {
            Ok(text) => Resolution::new(text, ReplySource::Remote),
            Err(e) => {
                tracing::warn!(error = %e, command = body, "remote generation failed");
                Resolution::new(CONNECTION_ERROR_REPLY, ReplySource::RemoteFailed)
            }
        }
    }

    fn apply(&self, rule: &Rule) -> Resolution {
        let text = match rule.reply {
            Reply::Fixed(text) => text.to_string(),
            Reply::Time => {
                let now = (self.clock)();
                format!("Sir, abhi {} baj rahe hain.", now.format("%-I:%M:%S %p"))
            }
            Reply::Date => {
                let now = (self.clock)();
                format!("Aaj ki tareekh hai {}, Sir.", now.format("%-d/%-m/%Y"))
            }
        };

        let action = match rule.effect {
            Effect::None => None,
            Effect::OpenUrl(raw) => match Url::parse(raw) {
                Ok(url) => Some(Action::OpenUrl(url)),
                Err(e) => {
                    tracing::error!(url = raw, error = %e, "invalid action URL");
                    None
                }
            },
            Effect::Launch(uri) => Some(Action::Launch(uri.to_string())),
        };

        Resolution {
            text,
            actions: action.into_iter().collect(),
            source: ReplySource::Local,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::Result;

    struct Echo;

    #[async_trait::async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo: {prompt}"))
        }
    }

    fn resolver() -> CommandResolver {
        CommandResolver::new(Arc::new(Echo), Connectivity::fixed(true))
    }

    fn fixed_clock() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 7, 15, 4, 5).unwrap()
    }

    #[test]
    fn test_earlier_rules_shadow_later_ones() {
        // "open code" is checked before the time rule
        let resolution = resolver().resolve_local("open code at this time").unwrap();
        assert_eq!(resolution.text, "Opening Visual Studio Code, Sir.");
        assert_eq!(resolution.actions, vec![Action::Launch("vscode://".to_string())]);
    }

    #[test]
    fn test_time_and_date_use_clock() {
        let resolver = resolver().with_clock(fixed_clock);

        let time = resolver.resolve_local("samay kya hua").unwrap();
        assert_eq!(time.text, "Sir, abhi 3:04:05 PM baj rahe hain.");

        let date = resolver.resolve_local("aaj ki tareekh").unwrap();
        assert_eq!(date.text, "Aaj ki tareekh hai 7/3/2026, Sir.");
    }

    #[test]
    fn test_greeting_requires_exact_match() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve_local("namaste").unwrap().text,
            "Hello Sir! Kya haal hai?"
        );
        assert!(resolver.resolve_local("hello there").is_none());
    }

    #[test]
    fn test_remote_fallback() {
        let resolution = tokio_test::block_on(resolver().resolve("tell me a joke"));
        assert_eq!(resolution.text, "echo: tell me a joke");
        assert_eq!(resolution.source, ReplySource::Remote);
    }
}
