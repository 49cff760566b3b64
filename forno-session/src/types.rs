//! Session types and configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::vocabulary::Vocabulary;

/// Message role in a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user message
    User,
    /// Assistant reply
    Assistant,
}

impl Role {
    /// Convert to string representation for database storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse from string representation.
    pub fn parse(s: &str) -> Self {
        match s {
            "assistant" => Self::Assistant,
            _ => Self::User, // Default fallback
        }
    }
}

/// A single message in a conversation session. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Who said it
    pub role: Role,
    /// Message text
    pub text: String,
    /// When it was appended
    pub timestamp: DateTime<Utc>,
    /// Channel-specific extras (message ids, channel name, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Turn {
    /// Create a new turn stamped with the current time.
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Attach channel metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// One line of a proposed or committed order.
///
/// Serialized field names (`price` in particular) are the shape handed to the
/// order backend on confirmation, so they stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Menu item name
    pub name: String,
    /// Quantity ordered
    pub qty: u32,
    /// Size/variant label ("large", "regular", ...)
    #[serde(default = "default_variant")]
    pub variant: String,
    /// Price per unit
    #[serde(rename = "price")]
    pub unit_price: f64,
}

fn default_variant() -> String {
    "regular".into()
}

/// A proposed order awaiting explicit user confirmation.
///
/// At most one exists per user (see [`crate::PendingOrders`]). Items may be
/// empty at this layer; the dispatcher validates at confirmation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    /// User the draft belongs to
    #[serde(rename = "user")]
    pub user_id: String,
    /// Proposed order lines
    pub items: Vec<OrderItem>,
    /// When the assistant proposed it
    pub created_at: DateTime<Utc>,
    /// Free-form extras forwarded to order creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl OrderDraft {
    /// Create a draft stamped with the current time.
    pub fn new(user_id: impl Into<String>, items: Vec<OrderItem>) -> Self {
        Self {
            user_id: user_id.into(),
            items,
            created_at: Utc::now(),
            metadata: None,
        }
    }
}

/// Intent tags the extractor can assign to a user turn. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SearchMenu,
    CreateOrder,
    OrderStatus,
    AskInfo,
    Greeting,
    Confirmation,
}

impl Intent {
    /// Stable string form used in prompts and API responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SearchMenu => "search_menu",
            Self::CreateOrder => "create_order",
            Self::OrderStatus => "order_status",
            Self::AskInfo => "ask_info",
            Self::Greeting => "greeting",
            Self::Confirmation => "confirmation",
        }
    }
}

/// What the user was last doing, by fixed priority over detected intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastAction {
    ConfirmingOrder,
    OrderRequested,
    BrowsingMenu,
    Conversation,
}

impl LastAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfirmingOrder => "confirming_order",
            Self::OrderRequested => "order_requested",
            Self::BrowsingMenu => "browsing_menu",
            Self::Conversation => "conversation",
        }
    }
}

/// Detected message language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageHint {
    English,
    Romanized,
}

impl LanguageHint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Romanized => "romanized",
        }
    }
}

/// Entities pulled out of recent user turns.
///
/// `mentioned_items` and `preferences` behave as sets (deduplicated,
/// first-seen order kept for determinism); `quantities` is a plain list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub mentioned_items: Vec<String>,
    pub quantities: Vec<u32>,
    pub preferences: Vec<String>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self.mentioned_items.is_empty() && self.quantities.is_empty() && self.preferences.is_empty()
    }
}

/// Compressed, derived view of a session.
///
/// Always recomputable from the turns plus the pending-order tracker; never
/// a source of truth on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Up to the three most recently first-seen intents, oldest first
    pub recent_intents: Vec<Intent>,
    pub entities: ExtractedEntities,
    pub last_action: LastAction,
    pub language_hint: LanguageHint,
    /// Total turns currently held for the user
    pub message_count: usize,
    /// Mirrors the pending-order tracker at compression time
    pub has_pending_order: bool,
}

impl Default for SessionSummary {
    fn default() -> Self {
        Self {
            recent_intents: Vec::new(),
            entities: ExtractedEntities::default(),
            last_action: LastAction::Conversation,
            language_hint: LanguageHint::English,
            message_count: 0,
            has_pending_order: false,
        }
    }
}

/// Conversation memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Max turns kept per user; oldest evicted first (default: 25)
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Idle minutes before a session expires (default: 30)
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,

    /// How many recent turns summaries are computed from (default: 8)
    #[serde(default = "default_summary_turns")]
    pub summary_turns: usize,

    /// Keyword vocabularies used by extraction and classification
    #[serde(default)]
    pub vocabulary: Vocabulary,
}

fn default_capacity() -> usize {
    25
}

fn default_expiry_minutes() -> i64 {
    30
}

fn default_summary_turns() -> usize {
    8
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            expiry_minutes: default_expiry_minutes(),
            summary_turns: default_summary_turns(),
            vocabulary: Vocabulary::default(),
        }
    }
}
