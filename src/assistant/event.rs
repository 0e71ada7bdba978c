//! Inputs to the orchestrator's transition function

use crate::commands::Resolution;
use crate::voice::{RecognitionEvent, SynthesisEvent};

/// Everything that can change the assistant's state
///
/// Backends, timers, the remote resolver and the user all report through
/// this one type so that a single function decides every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Speech recognition progress
    Recognition(RecognitionEvent),

    /// Speech synthesis progress
    Synthesis(SynthesisEvent),

    /// Set the master switch
    SetActive(bool),

    /// Flip the master switch
    Toggle,

    /// A delayed restart of listening came due
    ResumeListening {
        /// Switch epoch the restart was scheduled in
        epoch: u64,
    },

    /// A remote resolution finished
    Resolved {
        /// Switch epoch the command was dispatched in
        epoch: u64,
        /// Command body that was resolved
        body: String,
        /// The reply
        resolution: Resolution,
    },

    /// Connectivity changed
    ConnectivityChanged(bool),
}

impl From<RecognitionEvent> for Event {
    fn from(event: RecognitionEvent) -> Self {
        Self::Recognition(event)
    }
}

impl From<SynthesisEvent> for Event {
    fn from(event: SynthesisEvent) -> Self {
        Self::Synthesis(event)
    }
}
