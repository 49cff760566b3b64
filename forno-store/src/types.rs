//! Stored record types.

use chrono::{DateTime, Utc};
use forno_session::OrderItem;
use serde::{Deserialize, Serialize};

/// One entry of the menu catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

/// A knowledge-base chunk (FAQ entries, policies, store info).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbChunk {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub body: String,
}

/// A scored knowledge-base search hit.
#[derive(Debug, Clone, Serialize)]
pub struct KbHit {
    pub title: String,
    pub category: String,
    pub body: String,
    /// bm25 relevance, higher is better
    pub score: f32,
}

/// One status change in an order's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

impl TrackingEvent {
    pub fn now(status: impl Into<String>, note: Option<String>) -> Self {
        Self {
            status: status.into(),
            note,
            at: Utc::now(),
        }
    }
}

/// A committed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub status: String,
    #[serde(default)]
    pub tracking: Vec<TrackingEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-user profile built up from their activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_preference: Option<String>,
    #[serde(default)]
    pub order_count: u32,
    /// Item names from past orders, deduplicated
    #[serde(default)]
    pub favorites: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
