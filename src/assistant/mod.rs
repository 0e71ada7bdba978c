//! Interaction orchestration
//!
//! Owns the assistant state, the master switch and the conversation log, and
//! sequences listening, resolving and speaking so the assistant never hears
//! itself.

mod event;
mod orchestrator;
mod state;

pub use event::Event;
pub use orchestrator::Orchestrator;
pub use state::{AssistantState, Message, Sender, Snapshot};
