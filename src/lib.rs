//! FRIDAY - a voice assistant that listens for its wake word, answers
//! simple commands locally and forwards everything else to a language model
//!
//! This library provides the core functionality for the assistant:
//! - Wake word classification and the local command table
//! - Speech input and output controllers over pluggable backends
//! - The interaction state machine that keeps them from talking over each other
//! - Remote text generation and a connectivity signal
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Backends                          │
//! │   Microphone + STT  │  TTS + Speakers  │  Opener    │
//! └────────────────────┬────────────────────────────────┘
//!                      │ events
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Orchestrator                         │
//! │   State  │  Master switch  │  Transcript  │  Log    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               Command Resolver                       │
//! │   Command table  │  Offline reply  │  Chat API      │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod assistant;
pub mod commands;
pub mod config;
pub mod connectivity;
pub mod daemon;
pub mod error;
pub mod generation;
pub mod persona;
pub mod voice;

pub use actions::{Action, ActionLauncher, LogLauncher, RecordingLauncher, SystemLauncher};
pub use assistant::{AssistantState, Event, Message, Orchestrator, Sender, Snapshot};
pub use commands::{CommandResolver, Resolution, ReplySource};
pub use config::Config;
pub use connectivity::{Connectivity, ConnectivityMonitor};
pub use daemon::{Control, Daemon};
pub use error::{Error, Result};
pub use generation::{ChatClient, TextGenerator};
pub use persona::Persona;
