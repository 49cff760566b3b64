//! Session compression: recent turns → bounded summary → prompt context.

use std::collections::HashMap;
use std::fmt::Write as _;

use tokio::sync::RwLock;

use crate::extract::extract;
use crate::language::detect_language;
use crate::pending::PendingOrders;
use crate::store::SessionStore;
use crate::types::{Intent, LanguageHint, LastAction, Role, SessionSummary};
use crate::vocabulary::Vocabulary;

/// How many intents the summary keeps.
const RECENT_INTENTS: usize = 3;
/// Raw turns appended when `include_raw` is requested.
const RAW_TURNS: usize = 3;
/// Character budget per raw turn line.
const RAW_LINE_BUDGET: usize = 100;

/// Marker line rendered into the prompt context while a draft is staged.
pub const PENDING_ORDER_MARKER: &str = "PENDING ORDER awaiting confirmation";

/// Compresses a session into a [`SessionSummary`] and renders it for
/// prompts.
///
/// Summaries are cached per user purely as a read optimization within a
/// request; [`compress`](Self::compress) always recomputes, and the facade
/// invalidates the cache whenever turns or the pending draft change. The
/// summary is never a source of truth.
pub struct SessionCompressor {
    vocabulary: Vocabulary,
    summary_turns: usize,
    cache: RwLock<HashMap<String, SessionSummary>>,
}

impl SessionCompressor {
    pub fn new(vocabulary: Vocabulary, summary_turns: usize) -> Self {
        Self {
            vocabulary,
            summary_turns,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Recompute the user's summary from their recent turns and the
    /// pending-order tracker, cache it, and return it.
    pub async fn compress(
        &self,
        user_id: &str,
        store: &SessionStore,
        pending: &PendingOrders,
    ) -> SessionSummary {
        let turns = store.get_turns(user_id, Some(self.summary_turns)).await;
        let message_count = store.turn_count(user_id).await;

        let extraction = extract(&turns, &self.vocabulary);

        let skip = extraction.intents.len().saturating_sub(RECENT_INTENTS);
        let recent_intents = extraction.intents[skip..].to_vec();

        let last_action = last_action(&extraction.intents);

        let language_hint = turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| detect_language(&t.text, &self.vocabulary))
            .unwrap_or(LanguageHint::English);

        let summary = SessionSummary {
            recent_intents,
            entities: extraction.entities,
            last_action,
            language_hint,
            message_count,
            has_pending_order: pending.get(user_id).await.is_some(),
        };

        self.cache
            .write()
            .await
            .insert(user_id.to_string(), summary.clone());
        summary
    }

    /// Last cached summary, if any.
    pub async fn cached(&self, user_id: &str) -> Option<SessionSummary> {
        self.cache.read().await.get(user_id).cloned()
    }

    /// Drop the user's cached summary.
    pub async fn invalidate(&self, user_id: &str) {
        self.cache.write().await.remove(user_id);
    }

    /// Render the cached (or freshly computed) summary as a short bulleted
    /// block for inclusion in a generation prompt.
    ///
    /// With `include_raw`, the last [`RAW_TURNS`] turns are appended
    /// verbatim, truncated to [`RAW_LINE_BUDGET`] characters per line.
    pub async fn render_prompt_context(
        &self,
        user_id: &str,
        store: &SessionStore,
        pending: &PendingOrders,
        include_raw: bool,
    ) -> String {
        let summary = match self.cached(user_id).await {
            Some(summary) => summary,
            None => self.compress(user_id, store, pending).await,
        };

        let mut out = String::from("Conversation context:\n");

        if summary.message_count == 0 && !summary.has_pending_order {
            out.push_str("- New conversation\n");
        }

        if !summary.recent_intents.is_empty() {
            let intents: Vec<&str> = summary.recent_intents.iter().map(|i| i.as_str()).collect();
            let _ = writeln!(out, "- Recent intents: {}", intents.join(", "));
        }
        if !summary.entities.mentioned_items.is_empty() {
            let _ = writeln!(
                out,
                "- Mentioned items: {}",
                summary.entities.mentioned_items.join(", ")
            );
        }
        if !summary.entities.quantities.is_empty() {
            let quantities: Vec<String> =
                summary.entities.quantities.iter().map(u32::to_string).collect();
            let _ = writeln!(out, "- Quantities: {}", quantities.join(", "));
        }
        if !summary.entities.preferences.is_empty() {
            let _ = writeln!(out, "- Preferences: {}", summary.entities.preferences.join(", "));
        }
        if summary.message_count > 0 {
            let _ = writeln!(out, "- Language: {}", summary.language_hint.as_str());
            let _ = writeln!(out, "- Last action: {}", summary.last_action.as_str());
        }
        if summary.has_pending_order {
            let _ = writeln!(out, "- {PENDING_ORDER_MARKER}");
        }

        if include_raw {
            let turns = store.get_turns(user_id, Some(RAW_TURNS)).await;
            if !turns.is_empty() {
                out.push_str("Recent messages:\n");
                for turn in &turns {
                    let _ = writeln!(
                        out,
                        "- {}: {}",
                        turn.role.as_str(),
                        truncate(&turn.text, RAW_LINE_BUDGET)
                    );
                }
            }
        }

        out
    }
}

/// Fixed priority rule over the detected intents.
fn last_action(intents: &[Intent]) -> LastAction {
    if intents.contains(&Intent::Confirmation) {
        LastAction::ConfirmingOrder
    } else if intents.contains(&Intent::CreateOrder) {
        LastAction::OrderRequested
    } else if intents.contains(&Intent::SearchMenu) {
        LastAction::BrowsingMenu
    } else {
        LastAction::Conversation
    }
}

/// Truncate to a max character count, appending `...` when cut.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
