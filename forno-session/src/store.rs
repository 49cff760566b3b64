//! Bounded per-user turn history with idle expiry.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::backend::SessionBackend;
use crate::types::Turn;

#[derive(Debug, Clone)]
struct Session {
    turns: VecDeque<Turn>,
    last_activity: DateTime<Utc>,
}

/// Per-user ring buffer of turns.
///
/// Holds at most `capacity` turns per user (oldest evicted first) and drops
/// whole sessions after `expiry_minutes` without activity. Expiry runs
/// lazily on every call that touches the session map - there is no
/// background timer.
///
/// With a [`SessionBackend`] configured, appends and clears are mirrored
/// durably and a user's history is hydrated from the backend on the first
/// touch after a restart.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    capacity: usize,
    expiry: Duration,
    backend: Option<Arc<dyn SessionBackend>>,
}

impl SessionStore {
    pub fn new(
        capacity: usize,
        expiry_minutes: i64,
        backend: Option<Arc<dyn SessionBackend>>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capacity,
            expiry: Duration::minutes(expiry_minutes),
            backend,
        }
    }

    /// Append a turn to the user's session, creating it on first contact.
    ///
    /// Never fails: backend mirror errors are logged and the in-memory
    /// session stays authoritative for this process.
    pub async fn add_turn(&self, user_id: &str, turn: Turn) {
        self.hydrate(user_id).await;

        let expired = {
            let mut sessions = self.sessions.write().await;
            let expired = sweep(&mut sessions, Utc::now(), self.expiry);

            let session = sessions.entry(user_id.to_string()).or_insert_with(|| Session {
                turns: VecDeque::new(),
                last_activity: Utc::now(),
            });
            session.turns.push_back(turn.clone());
            while session.turns.len() > self.capacity {
                session.turns.pop_front();
            }
            session.last_activity = Utc::now();
            expired
        };
        self.drop_from_backend(&expired).await;

        if let Some(backend) = &self.backend {
            if let Err(e) = backend.persist_turn(user_id, &turn).await {
                tracing::warn!(user_id = %user_id, "Failed to mirror turn to store: {e}");
            }
        }
    }

    /// Turns for the user in chronological order, up to `last_n` most recent
    /// (all, bounded by capacity, when `None`). Empty if no session exists.
    pub async fn get_turns(&self, user_id: &str, last_n: Option<usize>) -> Vec<Turn> {
        self.hydrate(user_id).await;

        let (turns, expired) = {
            let mut sessions = self.sessions.write().await;
            let expired = sweep(&mut sessions, Utc::now(), self.expiry);

            let turns = sessions
                .get(user_id)
                .map(|s| {
                    let skip = match last_n {
                        Some(n) => s.turns.len().saturating_sub(n),
                        None => 0,
                    };
                    s.turns.iter().skip(skip).cloned().collect()
                })
                .unwrap_or_default();
            (turns, expired)
        };
        self.drop_from_backend(&expired).await;

        turns
    }

    /// Total turns currently held for the user.
    pub async fn turn_count(&self, user_id: &str) -> usize {
        self.hydrate(user_id).await;
        self.sessions
            .read()
            .await
            .get(user_id)
            .map(|s| s.turns.len())
            .unwrap_or(0)
    }

    /// Remove the user's session here and in the backend.
    pub async fn clear(&self, user_id: &str) {
        self.sessions.write().await.remove(user_id);

        if let Some(backend) = &self.backend {
            if let Err(e) = backend.delete_session(user_id).await {
                tracing::warn!(user_id = %user_id, "Failed to delete mirrored session: {e}");
            }
        }
    }

    /// Number of live sessions.
    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Sum of turns across all live sessions.
    pub async fn total_turns(&self) -> usize {
        self.sessions.read().await.values().map(|s| s.turns.len()).sum()
    }

    /// Load the user's history from the backend if this process has not seen
    /// them yet. A hydrated session older than the expiry window is
    /// discarded instead of resurrected.
    async fn hydrate(&self, user_id: &str) {
        let Some(backend) = &self.backend else {
            return;
        };
        if self.sessions.read().await.contains_key(user_id) {
            return;
        }

        let turns = match backend.load_turns(user_id).await {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!(user_id = %user_id, "Failed to load mirrored session: {e}");
                return;
            }
        };
        let Some(last) = turns.last() else {
            return;
        };

        let last_activity = last.timestamp;
        if Utc::now() - last_activity > self.expiry {
            tracing::debug!(user_id = %user_id, "Mirrored session expired, dropping");
            if let Err(e) = backend.delete_session(user_id).await {
                tracing::warn!(user_id = %user_id, "Failed to delete expired session: {e}");
            }
            return;
        }

        let skip = turns.len().saturating_sub(self.capacity);
        let mut sessions = self.sessions.write().await;
        sessions.entry(user_id.to_string()).or_insert_with(|| Session {
            turns: turns.into_iter().skip(skip).collect(),
            last_activity,
        });
    }

    async fn drop_from_backend(&self, expired: &[String]) {
        let Some(backend) = &self.backend else {
            return;
        };
        for user_id in expired {
            if let Err(e) = backend.delete_session(user_id).await {
                tracing::warn!(user_id = %user_id, "Failed to delete expired session: {e}");
            }
        }
    }
}

/// Remove sessions idle past the expiry window; returns the affected users.
fn sweep(
    sessions: &mut HashMap<String, Session>,
    now: DateTime<Utc>,
    expiry: Duration,
) -> Vec<String> {
    let expired: Vec<String> = sessions
        .iter()
        .filter(|(_, s)| now - s.last_activity > expiry)
        .map(|(user, _)| user.clone())
        .collect();

    for user in &expired {
        sessions.remove(user);
        tracing::debug!(user_id = %user, "Session expired");
    }
    expired
}
