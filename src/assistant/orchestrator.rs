//! The assistant's state machine

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use super::event::Event;
use super::state::{AssistantState, Message, Sender, Snapshot};
use crate::actions::{ActionLauncher, LogLauncher};
use crate::commands::{CommandResolver, Resolution};
use crate::config::TimingConfig;
use crate::persona::Persona;
use crate::voice::{
    Classification, ErrorDisposition, RecognitionErrorKind, RecognitionEvent, SpeechInput,
    SpeechOutput, SynthesisEvent, UtteranceId, WakeWordDetector,
};

/// Sequences recognition, resolution and synthesis
///
/// All changes go through [`Orchestrator::handle`]. Work that finishes later
/// (remote resolution, delayed restarts) is posted back as an [`Event`] on
/// the queue given at construction, tagged with the switch epoch so that
/// results from before a switch-off are dropped.
pub struct Orchestrator {
    state: AssistantState,
    active: bool,
    permission_granted: bool,
    online: bool,
    epoch: u64,
    retry_pending: bool,
    transcript: String,
    messages: Vec<Message>,
    current_utterance: Option<UtteranceId>,
    input: SpeechInput,
    output: SpeechOutput,
    resolver: CommandResolver,
    detector: WakeWordDetector,
    launcher: Arc<dyn ActionLauncher>,
    timing: TimingConfig,
    announcement: String,
    farewell: String,
    queue: mpsc::UnboundedSender<Event>,
    snapshot: watch::Sender<Snapshot>,
}

impl Orchestrator {
    /// Create an orchestrator with the switch off
    #[must_use]
    pub fn new(
        input: SpeechInput,
        output: SpeechOutput,
        resolver: CommandResolver,
        detector: WakeWordDetector,
        queue: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let persona = Persona::default();
        let (snapshot, _) = watch::channel(Snapshot::default());

        Self {
            state: AssistantState::Idle,
            active: false,
            permission_granted: true,
            online: true,
            epoch: 0,
            retry_pending: false,
            transcript: String::new(),
            messages: Vec::new(),
            current_utterance: None,
            input,
            output,
            resolver,
            detector,
            launcher: Arc::new(LogLauncher),
            timing: TimingConfig::default(),
            announcement: persona.announcement,
            farewell: persona.farewell,
            queue,
            snapshot,
        }
    }

    /// Use `launcher` for command side effects
    #[must_use]
    pub fn with_launcher(mut self, launcher: Arc<dyn ActionLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Use `timing` for restart delays
    #[must_use]
    pub const fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Take the switch-on and switch-off lines from `persona`
    #[must_use]
    pub fn with_persona(mut self, persona: &Persona) -> Self {
        self.announcement.clone_from(&persona.announcement);
        self.farewell.clone_from(&persona.farewell);
        self
    }

    /// Seed the last known connectivity
    #[must_use]
    pub fn with_online(mut self, online: bool) -> Self {
        self.online = online;
        self.publish();
        self
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> AssistantState {
        self.state
    }

    /// Whether the master switch is on
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether recognition permission is still granted
    #[must_use]
    pub const fn permission_granted(&self) -> bool {
        self.permission_granted
    }

    /// Current switch epoch
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// In-progress transcript
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Conversation log, oldest first
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current front-end view
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            active: self.active,
            permission_granted: self.permission_granted,
            online: self.online,
            transcript: self.transcript.clone(),
        }
    }

    /// Watch the front-end view
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    /// Apply one event
    pub fn handle(&mut self, event: Event) {
        tracing::trace!(?event, state = %self.state, "handling event");

        match event {
            Event::Recognition(event) => self.on_recognition(event),
            Event::Synthesis(event) => self.on_synthesis(event),
            Event::SetActive(on) => self.set_active(on),
            Event::Toggle => self.set_active(!self.active),
            Event::ResumeListening { epoch } => self.on_resume(epoch),
            Event::Resolved {
                epoch,
                body,
                resolution,
            } => self.on_resolved(epoch, &body, resolution),
            Event::ConnectivityChanged(online) => {
                if online != self.online {
                    tracing::info!(online, "connectivity changed");
                }
                self.online = online;
            }
        }

        self.publish();
    }

    /// Stop recognition and speech
    pub fn shutdown(&mut self) {
        self.input.abort();
        self.output.cancel();
        self.current_utterance = None;
        self.set_state(AssistantState::Idle);
        self.publish();
    }

    fn on_recognition(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Interim(text) => {
                if !self.active {
                    tracing::trace!("interim transcript while inactive ignored");
                    return;
                }
                if self.state == AssistantState::Idle && self.detector.contains_wake_word(&text) {
                    self.set_state(AssistantState::Listening);
                }
                self.transcript = text;
            }
            RecognitionEvent::Error(kind) => self.on_recognition_error(&kind),
            RecognitionEvent::SessionEnded => self.on_session_ended(),
        }
    }

    fn on_recognition_error(&mut self, kind: &RecognitionErrorKind) {
        match kind.disposition(&self.timing.backoff) {
            ErrorDisposition::Ignore => {
                tracing::trace!(error = %kind, "recognition error ignored");
            }
            ErrorDisposition::Fatal => {
                tracing::error!(error = %kind, "microphone permission denied");
                self.permission_granted = false;
                self.deactivate();
            }
            ErrorDisposition::Retry(delay) => {
                if matches!(kind, RecognitionErrorKind::Network) {
                    tracing::warn!(error = %kind, "recognition network error, retrying");
                } else {
                    tracing::error!(error = %kind, "recognition error");
                }

                if self.active {
                    self.retry_pending = true;
                    self.schedule_resume(delay);
                }
            }
        }
    }

    fn on_session_ended(&mut self) {
        let transcript = std::mem::take(&mut self.transcript);

        if self.state == AssistantState::Speaking {
            if !transcript.trim().is_empty() {
                tracing::debug!(transcript, "discarding transcript heard while speaking");
            }
            return;
        }

        if transcript.trim().is_empty() {
            if self.active && self.state != AssistantState::Processing {
                self.restart_now();
            } else if !self.active {
                self.set_state(AssistantState::Idle);
            }
            return;
        }

        match self.detector.classify(&transcript) {
            Classification::Matched(body) => self.dispatch(transcript, body),
            Classification::NotMatched => {
                tracing::debug!(transcript, "no wake word");
                if self.active {
                    self.restart_now();
                }
            }
        }
    }

    /// Restart listening at once unless an error backoff owns the restart
    fn restart_now(&mut self) {
        if self.retry_pending {
            return;
        }
        self.input.start(self.state);
    }

    fn dispatch(&mut self, transcript: String, body: String) {
        tracing::debug!(command = %body, "dispatching command");

        self.set_state(AssistantState::Processing);
        self.messages.push(Message::new(transcript, Sender::User));

        if let Some(resolution) = self.resolver.resolve_local(&body) {
            self.deliver(resolution);
            return;
        }

        let resolver = self.resolver.clone();
        let queue = self.queue.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let resolution = resolver.resolve_remote(&body).await;
            let _ = queue.send(Event::Resolved {
                epoch,
                body,
                resolution,
            });
        });
    }

    fn on_resolved(&mut self, epoch: u64, body: &str, resolution: Resolution) {
        if epoch != self.epoch {
            tracing::info!(
                command = body,
                epoch,
                current = self.epoch,
                "discarding response from before switch-off"
            );
            return;
        }

        self.deliver(resolution);
    }

    fn deliver(&mut self, resolution: Resolution) {
        tracing::debug!(source = ?resolution.source, "command resolved");

        for action in &resolution.actions {
            self.launcher.launch(action);
        }

        self.messages
            .push(Message::new(resolution.text.clone(), Sender::Assistant));
        self.say(&resolution.text);
    }

    fn say(&mut self, text: &str) {
        match self.output.speak(text) {
            Ok(id) => self.current_utterance = Some(id),
            Err(e) => {
                tracing::error!(error = %e, "speech output failed");
                self.current_utterance = None;
                self.finish_speaking();
            }
        }
    }

    fn on_synthesis(&mut self, event: SynthesisEvent) {
        match event {
            SynthesisEvent::Started(id) if self.current_utterance == Some(id) => {
                self.set_state(AssistantState::Speaking);
                self.input.abort();
            }
            SynthesisEvent::Ended(id) if self.current_utterance == Some(id) => {
                self.current_utterance = None;
                self.finish_speaking();
            }
            SynthesisEvent::Started(id) | SynthesisEvent::Ended(id) => {
                tracing::trace!(id = %id, "event for preempted utterance ignored");
            }
        }
    }

    fn finish_speaking(&mut self) {
        self.set_state(AssistantState::Idle);
        if self.active {
            self.schedule_resume(self.timing.resume_delay);
        }
    }

    fn on_resume(&mut self, epoch: u64) {
        if epoch != self.epoch || !self.active {
            tracing::trace!(epoch, current = self.epoch, "stale restart dropped");
            return;
        }

        self.retry_pending = false;
        self.input.start(self.state);
    }

    fn set_active(&mut self, on: bool) {
        if on == self.active {
            return;
        }

        if on {
            tracing::info!("assistant switched on");
            self.active = true;
            self.permission_granted = true;
            self.retry_pending = false;
            let announcement = self.announcement.clone();
            self.say(&announcement);
            self.input.start(self.state);
        } else {
            tracing::info!("assistant switched off");
            self.deactivate();
            let farewell = self.farewell.clone();
            self.say(&farewell);
        }
    }

    /// Switch off and invalidate everything scheduled so far
    fn deactivate(&mut self) {
        self.active = false;
        self.epoch += 1;
        self.retry_pending = false;
        self.transcript.clear();
        self.input.stop();
        self.set_state(AssistantState::Idle);
    }

    fn schedule_resume(&self, delay: Duration) {
        let queue = self.queue.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = queue.send(Event::ResumeListening { epoch });
        });
    }

    fn set_state(&mut self, next: AssistantState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "state transition");
            self.state = next;
        }
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.snapshot());
    }
}
