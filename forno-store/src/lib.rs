//! Forno Store - SQLite persistence for the pizza assistant.
//!
//! One database file holds:
//! - the menu catalog (`menu_items`)
//! - knowledge-base chunks with an FTS5 index (`kb_chunks`) for scored
//!   keyword search
//! - committed orders with a tracking timeline (`orders`)
//! - user profiles (`users`)
//! - the durable mirror of chat sessions (`chat_turns`), implementing
//!   [`forno_session::SessionBackend`]
//!
//! All calls open their own connection inside `spawn_blocking`, so the store
//! handle is cheap to clone and share.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::{KbChunk, KbHit, MenuItem, OrderRecord, TrackingEvent, UserProfile};
