//! Forno Agent - the conversation dispatcher.
//!
//! Per incoming message the dispatcher decides whether it confirms a
//! pending order, proposes a new one, calls a read-only tool, or just gets
//! a direct reply. Order placement always happens in two phases: a
//! suggestion that writes a pending draft, then an explicit user
//! confirmation that commits it.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod decision;
pub mod dispatcher;
pub mod prompt;

pub use decision::{parse_decision, AgentDecision};
pub use dispatcher::{ChatOutcome, Dispatcher, DispatcherConfig, OutcomeStatus};
pub use prompt::build_system_prompt;
