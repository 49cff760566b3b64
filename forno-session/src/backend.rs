//! Durable mirror for the in-process session store.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::Turn;

/// Persistence seam for session turns.
///
/// When a backend is configured, the [`crate::SessionStore`] mirrors every
/// append and clear into it and hydrates from it on first touch after a
/// restart. When absent, sessions live purely in process memory.
///
/// Backend failures must never fail the conversation: callers log and move
/// on, the in-memory session stays the source of truth for the running
/// process.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Append one turn to the user's durable history.
    async fn persist_turn(&self, user_id: &str, turn: &Turn) -> Result<()>;

    /// Load the user's full stored history, oldest first.
    async fn load_turns(&self, user_id: &str) -> Result<Vec<Turn>>;

    /// Drop the user's stored history.
    async fn delete_session(&self, user_id: &str) -> Result<()>;
}
