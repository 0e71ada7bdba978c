//! Daemon - the main assistant service
//!
//! Wires the microphone, speech APIs, connectivity probe and action launcher
//! to the [`Orchestrator`] and feeds it events until interrupted.

use std::sync::Arc;

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use crate::actions::{ActionLauncher, LogLauncher, SystemLauncher};
use crate::assistant::{Event, Message, Orchestrator, Sender, Snapshot};
use crate::commands::{CommandResolver, Resolution};
use crate::connectivity::{Connectivity, ConnectivityMonitor};
use crate::generation::ChatClient;
use crate::voice::{
    Classification, CloudSynthesizer, MicRecognizer, SpeechInput, SpeechOutput, SpeechToText,
    TextToSpeech, WakeWordDetector, probe_input,
};
use crate::{Config, Result};

/// A line typed on the control console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Forward an event to the orchestrator
    Event(Event),
    /// Print the current snapshot
    Status,
    /// Stop the daemon
    Quit,
}

impl Control {
    /// Parse a console line
    ///
    /// An empty line toggles the master switch. Unknown input yields `None`.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "on" | "start" => Some(Self::Event(Event::SetActive(true))),
            "off" | "stop" => Some(Self::Event(Event::SetActive(false))),
            "" | "toggle" => Some(Self::Event(Event::Toggle)),
            "status" => Some(Self::Status),
            "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// The FRIDAY daemon
pub struct Daemon {
    config: Config,
}

impl Daemon {
    /// Create a new daemon instance
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Primary wake word
    #[must_use]
    pub fn wake_word(&self) -> Option<&str> {
        self.config.persona.wake_word()
    }

    /// Resolve a typed utterance without audio
    ///
    /// Typed input is addressed to the assistant, so text without the wake
    /// word is resolved as a whole. Connectivity is probed once up front.
    ///
    /// # Errors
    ///
    /// Returns error if the wake word or generator configuration is invalid
    pub async fn ask(&self, text: &str) -> Result<Resolution> {
        let detector = WakeWordDetector::new(self.config.persona.wake_words.clone())?;
        let body = match detector.classify(text) {
            Classification::Matched(body) => body,
            Classification::NotMatched => text.trim().to_lowercase(),
        };

        let connectivity =
            ConnectivityMonitor::probe_once(&self.config.connectivity.probe_url).await;
        let resolver = self.resolver(connectivity)?;
        Ok(resolver.resolve(&body).await)
    }

    fn resolver(&self, connectivity: Connectivity) -> Result<CommandResolver> {
        let generator = ChatClient::new(&self.config.generation, self.config.persona.system_prompt())?;
        Ok(CommandResolver::new(Arc::new(generator), connectivity))
    }

    /// Run the daemon until interrupted
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Unsupported`] without a microphone, or error if
    /// initialization fails
    #[allow(clippy::too_many_lines)]
    pub async fn run(self) -> Result<()> {
        let microphone = probe_input()?;
        tracing::info!(
            microphone = %microphone,
            persona = %self.config.persona.name,
            "daemon running"
        );

        let (connectivity, _probe) = ConnectivityMonitor::spawn(
            self.config.connectivity.probe_url.clone(),
            self.config.connectivity.interval,
        );
        let resolver = self.resolver(connectivity.clone())?;

        let launcher: Arc<dyn ActionLauncher> = match SystemLauncher::detect() {
            Ok(launcher) => Arc::new(launcher),
            Err(e) => {
                tracing::warn!(error = %e, "actions will only be logged");
                Arc::new(LogLauncher)
            }
        };

        let voice = &self.config.voice;
        let (recognition_tx, mut recognition_rx) = mpsc::unbounded_channel();
        let (synthesis_tx, mut synthesis_rx) = mpsc::unbounded_channel();
        let (queue_tx, mut queue_rx) = mpsc::unbounded_channel();

        let input = SpeechInput::new(Box::new(MicRecognizer::new(
            SpeechToText::new(voice),
            recognition_tx,
            voice.max_session,
        )));
        let output = SpeechOutput::new(
            Box::new(CloudSynthesizer::new(
                TextToSpeech::new(voice),
                voice.voices.clone(),
                synthesis_tx,
            )),
            voice.prosody,
        );
        let detector = WakeWordDetector::new(self.config.persona.wake_words.clone())?;

        let mut orchestrator = Orchestrator::new(input, output, resolver, detector, queue_tx.clone())
            .with_launcher(launcher)
            .with_timing(self.config.timing)
            .with_persona(&self.config.persona)
            .with_online(connectivity.is_online());

        // Forward connectivity changes
        let connectivity_queue = queue_tx.clone();
        let mut watched = connectivity;
        tokio::spawn(async move {
            while let Some(online) = watched.changed().await {
                if connectivity_queue.send(Event::ConnectivityChanged(online)).is_err() {
                    break;
                }
            }
        });

        let mut control_rx = spawn_console();

        // Set up shutdown signal
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        if let Some(wake_word) = self.wake_word() {
            tracing::info!("FRIDAY ready - type \"on\" and say \"{wake_word}\"");
        }

        if self.config.start_active {
            orchestrator.handle(Event::SetActive(true));
        }

        let mut printed = 0;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                Some(event) = recognition_rx.recv() => orchestrator.handle(event.into()),
                Some(event) = synthesis_rx.recv() => orchestrator.handle(event.into()),
                Some(event) = queue_rx.recv() => orchestrator.handle(event),
                Some(control) = control_rx.recv() => match control {
                    Control::Event(event) => orchestrator.handle(event),
                    Control::Status => print_status(&orchestrator.snapshot()),
                    Control::Quit => break,
                },
            }

            printed = print_messages(orchestrator.messages(), printed);
        }

        orchestrator.shutdown();
        Ok(())
    }
}

/// Read control lines from stdin
///
/// The channel closes when stdin does; the daemon keeps running.
fn spawn_console() -> mpsc::UnboundedReceiver<Control> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match Control::parse(&line) {
                    Some(control) => {
                        if tx.send(control).is_err() {
                            break;
                        }
                    }
                    None => println!("commands: on, off, toggle (or empty line), status, quit"),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "console read failed");
                    break;
                }
            }
        }
    });

    rx
}

fn print_status(snapshot: &Snapshot) {
    match serde_json::to_string_pretty(snapshot) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "failed to render status"),
    }
}

/// Print messages appended since `from`, returning the new count
fn print_messages(messages: &[Message], from: usize) -> usize {
    for message in messages.iter().skip(from) {
        let who = match message.sender {
            Sender::User => "you",
            Sender::Assistant => "friday",
        };
        println!(
            "[{}] {who}: {}",
            message.timestamp.format("%H:%M:%S"),
            message.text
        );
    }
    messages.len()
}
