//! Conversation memory facade.

use std::sync::Arc;

use serde::Serialize;

use crate::backend::SessionBackend;
use crate::pending::PendingOrders;
use crate::store::SessionStore;
use crate::summary::SessionCompressor;
use crate::types::{MemoryConfig, OrderDraft, Role, SessionSummary, Turn};
use crate::vocabulary::Vocabulary;

/// Everything the dialogue loop knows about a user between requests:
/// bounded turn history, cached summary, and the pending-order slot.
///
/// The facade exists so the components stay consistent with each other:
/// appending a turn or touching the pending slot invalidates the cached
/// summary, and [`clear`](Self::clear) removes session, summary, and draft
/// together.
pub struct SessionMemory {
    store: SessionStore,
    pending: PendingOrders,
    compressor: SessionCompressor,
}

/// Point-in-time counters for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStats {
    pub active_sessions: usize,
    pub total_turns: usize,
    pub pending_orders: usize,
}

impl SessionMemory {
    pub fn new(config: MemoryConfig, backend: Option<Arc<dyn SessionBackend>>) -> Self {
        Self {
            store: SessionStore::new(config.capacity, config.expiry_minutes, backend),
            pending: PendingOrders::new(),
            compressor: SessionCompressor::new(config.vocabulary, config.summary_turns),
        }
    }

    /// Append a turn to the user's history.
    pub async fn add_turn(&self, user_id: &str, role: Role, text: impl Into<String>) {
        self.store.add_turn(user_id, Turn::new(role, text)).await;
        self.compressor.invalidate(user_id).await;
    }

    /// Append a turn carrying channel metadata.
    pub async fn add_turn_with_metadata(
        &self,
        user_id: &str,
        role: Role,
        text: impl Into<String>,
        metadata: serde_json::Value,
    ) {
        self.store
            .add_turn(user_id, Turn::new(role, text).with_metadata(metadata))
            .await;
        self.compressor.invalidate(user_id).await;
    }

    /// Turns in chronological order, up to `last_n` most recent.
    pub async fn get_turns(&self, user_id: &str, last_n: Option<usize>) -> Vec<Turn> {
        self.store.get_turns(user_id, last_n).await
    }

    /// Total turns currently held for the user.
    pub async fn turn_count(&self, user_id: &str) -> usize {
        self.store.turn_count(user_id).await
    }

    /// Remove everything known about the user: session turns, cached
    /// summary, and any pending order draft.
    pub async fn clear(&self, user_id: &str) {
        self.store.clear(user_id).await;
        self.compressor.invalidate(user_id).await;
        if self.pending.clear(user_id).await.is_some() {
            tracing::debug!(user_id = %user_id, "Dropped pending order draft on clear");
        }
    }

    /// Fresh summary of the user's recent turns.
    pub async fn compress(&self, user_id: &str) -> SessionSummary {
        self.compressor.compress(user_id, &self.store, &self.pending).await
    }

    /// Summary rendered for inclusion in a generation prompt.
    pub async fn prompt_context(&self, user_id: &str, include_raw: bool) -> String {
        self.compressor
            .render_prompt_context(user_id, &self.store, &self.pending, include_raw)
            .await
    }

    /// Stage an order draft for the user (overwrites any previous draft).
    pub async fn set_pending_order(&self, user_id: &str, draft: OrderDraft) {
        self.pending.set(user_id, draft).await;
        self.compressor.invalidate(user_id).await;
    }

    /// Current order draft, if any.
    pub async fn get_pending_order(&self, user_id: &str) -> Option<OrderDraft> {
        self.pending.get(user_id).await
    }

    /// Drop the user's order draft.
    pub async fn clear_pending_order(&self, user_id: &str) -> Option<OrderDraft> {
        let removed = self.pending.clear(user_id).await;
        self.compressor.invalidate(user_id).await;
        removed
    }

    /// True if the message counts as an order confirmation.
    pub fn is_confirmation(&self, text: &str) -> bool {
        self.compressor.vocabulary().is_confirmation(text)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.compressor.vocabulary()
    }

    pub async fn stats(&self) -> MemoryStats {
        MemoryStats {
            active_sessions: self.store.active_sessions().await,
            total_turns: self.store.total_turns().await,
            pending_orders: self.pending.len().await,
        }
    }
}
