//! Forno Session - short-term conversation memory for the pizza assistant.
//!
//! This crate owns everything the dialogue loop needs to stay coherent across
//! turns without re-reading full transcripts:
//!
//! - [`SessionStore`]: bounded per-user turn history with idle expiry and an
//!   optional durable mirror ([`SessionBackend`])
//! - [`extract`]: deterministic keyword extraction of intents and entities
//! - [`SessionCompressor`]: compresses recent turns into a [`SessionSummary`]
//!   and renders it as a prompt context block
//! - [`PendingOrders`]: the single-slot staging area between "assistant
//!   proposed an order" and "user confirmed it"
//! - [`SessionMemory`]: the facade tying the above together so `clear`
//!   removes session, cached summary, and pending draft in one call
//!
//! # Example
//!
//! ```ignore
//! use forno_session::{MemoryConfig, Role, SessionMemory};
//!
//! let memory = SessionMemory::new(MemoryConfig::default(), None);
//! memory.add_turn("user-1", Role::User, "I want 2 large pepperoni pizzas").await;
//! let summary = memory.compress("user-1").await;
//! assert!(summary.entities.quantities.contains(&2));
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod backend;
pub mod extract;
pub mod language;
pub mod memory;
pub mod pending;
pub mod store;
pub mod summary;
pub mod types;
pub mod vocabulary;

pub use backend::SessionBackend;
pub use extract::{extract, Extraction};
pub use language::detect_language;
pub use memory::{MemoryStats, SessionMemory};
pub use pending::PendingOrders;
pub use store::SessionStore;
pub use summary::SessionCompressor;
pub use types::{
    ExtractedEntities, Intent, LanguageHint, LastAction, MemoryConfig, OrderDraft, OrderItem,
    Role, SessionSummary, Turn,
};
pub use vocabulary::Vocabulary;
