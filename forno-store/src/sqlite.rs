//! SQLite store with FTS5 knowledge-base search.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use forno_session::{OrderItem, Role, SessionBackend, Turn};

use crate::types::{KbChunk, KbHit, MenuItem, OrderRecord, TrackingEvent, UserProfile};

/// Max mirrored turns kept per user; enough to rebuild any session window
/// after a restart while keeping the table from growing unbounded.
const MIRROR_KEEP: usize = 100;

/// Handle to the Forno database.
///
/// Every operation opens its own connection inside `spawn_blocking`, so the
/// handle is `Clone` and safe to share across tasks.
#[derive(Clone)]
pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (and if needed create) the database at `path`, initializing the
    /// schema idempotently.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS menu_items (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT '',
                price REAL NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                available INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS kb_chunks (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL
            );

            CREATE VIRTUAL TABLE IF NOT EXISTS kb_fts USING fts5(
                id,
                title,
                body,
                content='kb_chunks',
                content_rowid='rowid'
            );

            CREATE TRIGGER IF NOT EXISTS kb_chunks_ai AFTER INSERT ON kb_chunks BEGIN
                INSERT INTO kb_fts(rowid, id, title, body)
                VALUES (new.rowid, new.id, new.title, new.body);
            END;

            CREATE TRIGGER IF NOT EXISTS kb_chunks_ad AFTER DELETE ON kb_chunks BEGIN
                INSERT INTO kb_fts(kb_fts, rowid, id, title, body)
                VALUES ('delete', old.rowid, old.id, old.title, old.body);
            END;

            CREATE TRIGGER IF NOT EXISTS kb_chunks_au AFTER UPDATE ON kb_chunks BEGIN
                INSERT INTO kb_fts(kb_fts, rowid, id, title, body)
                VALUES ('delete', old.rowid, old.id, old.title, old.body);
                INSERT INTO kb_fts(rowid, id, title, body)
                VALUES (new.rowid, new.id, new.title, new.body);
            END;

            CREATE TABLE IF NOT EXISTS orders (
                order_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                items TEXT NOT NULL,
                total REAL NOT NULL,
                status TEXT NOT NULL,
                tracking TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id);

            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                language_preference TEXT,
                order_count INTEGER NOT NULL DEFAULT 0,
                favorites TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chat_turns_user ON chat_turns(user_id);
            "#,
        )?;

        Ok(Self {
            db_path: path.to_path_buf(),
        })
    }

    // ========================================================================
    // Menu
    // ========================================================================

    /// Insert or replace a menu item.
    pub async fn insert_menu_item(&self, item: &MenuItem) -> Result<()> {
        let db_path = self.db_path.clone();
        let item = item.clone();
        let tags = serde_json::to_string(&item.tags)?;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "INSERT OR REPLACE INTO menu_items (id, name, description, category, price, tags, available)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    item.id,
                    item.name,
                    item.description,
                    item.category,
                    item.price,
                    tags,
                    item.available as i64,
                ],
            )?;
            Ok(())
        })
        .await?
    }

    /// All available menu items, name order, up to `limit`.
    pub async fn all_menu_items(&self, limit: usize) -> Result<Vec<MenuItem>> {
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<MenuItem>> {
            let conn = Connection::open(&db_path)?;
            let sql = format!(
                "SELECT id, name, description, category, price, tags, available
                 FROM menu_items WHERE available = 1 ORDER BY name LIMIT {limit}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], menu_item_from_row)?;
            Ok(rows.flatten().collect())
        })
        .await?
    }

    /// Available menu items in a category (case-insensitive).
    pub async fn menu_by_category(&self, category: &str) -> Result<Vec<MenuItem>> {
        let db_path = self.db_path.clone();
        let category = category.to_lowercase();

        tokio::task::spawn_blocking(move || -> Result<Vec<MenuItem>> {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT id, name, description, category, price, tags, available
                 FROM menu_items WHERE available = 1 AND LOWER(category) = ?1 ORDER BY name",
            )?;
            let rows = stmt.query_map(params![category], menu_item_from_row)?;
            Ok(rows.flatten().collect())
        })
        .await?
    }

    /// Case-insensitive substring search over name, description, category,
    /// and tags.
    pub async fn search_menu(&self, query: &str) -> Result<Vec<MenuItem>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let db_path = self.db_path.clone();
        let pattern = format!("%{}%", query.to_lowercase());

        tokio::task::spawn_blocking(move || -> Result<Vec<MenuItem>> {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT id, name, description, category, price, tags, available
                 FROM menu_items
                 WHERE available = 1 AND (
                     LOWER(name) LIKE ?1 OR LOWER(description) LIKE ?1
                     OR LOWER(category) LIKE ?1 OR LOWER(tags) LIKE ?1
                 )
                 ORDER BY name",
            )?;
            let rows = stmt.query_map(params![pattern], menu_item_from_row)?;
            Ok(rows.flatten().collect())
        })
        .await?
    }

    // ========================================================================
    // Knowledge base
    // ========================================================================

    /// Insert or replace a knowledge-base chunk.
    pub async fn insert_kb_chunk(&self, chunk: &KbChunk) -> Result<()> {
        let db_path = self.db_path.clone();
        let chunk = chunk.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&db_path)?;
            // REPLACE deletes without firing the delete trigger and would
            // desync the FTS index, so conflicts go through UPDATE.
            conn.execute(
                "INSERT INTO kb_chunks (id, title, category, body) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     category = excluded.category,
                     body = excluded.body",
                params![chunk.id, chunk.title, chunk.category, chunk.body],
            )?;
            Ok(())
        })
        .await?
    }

    /// Top-K knowledge-base chunks ranked by bm25.
    pub async fn search_kb(&self, query: &str, top_k: usize) -> Result<Vec<KbHit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let escaped = escape_fts5_query(query);
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<KbHit>> {
            let conn = Connection::open(&db_path)?;
            let sql = format!(
                "SELECT c.title, c.category, c.body, -bm25(kb_fts) AS score
                 FROM kb_fts JOIN kb_chunks c ON c.rowid = kb_fts.rowid
                 WHERE kb_fts MATCH ?1 ORDER BY score DESC LIMIT {top_k}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![escaped], |row| {
                Ok(KbHit {
                    title: row.get(0)?,
                    category: row.get(1)?,
                    body: row.get(2)?,
                    score: row.get::<_, f64>(3)? as f32,
                })
            })?;
            Ok(rows.flatten().collect())
        })
        .await?
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Insert a committed order.
    pub async fn insert_order(&self, order: &OrderRecord) -> Result<()> {
        let db_path = self.db_path.clone();
        let order = order.clone();
        let items = serde_json::to_string(&order.items)?;
        let tracking = serde_json::to_string(&order.tracking)?;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "INSERT INTO orders (order_id, user_id, items, total, status, tracking, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    order.order_id,
                    order.user_id,
                    items,
                    order.total,
                    order.status,
                    tracking,
                    order.created_at.to_rfc3339(),
                    order.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?
    }

    /// Full order record by id.
    pub async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>> {
        let db_path = self.db_path.clone();
        let order_id = order_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<OrderRecord>> {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT order_id, user_id, items, total, status, tracking, created_at, updated_at
                 FROM orders WHERE order_id = ?1",
            )?;
            let mut rows = stmt.query_map(params![order_id], order_from_row)?;
            Ok(rows.next().transpose()?)
        })
        .await?
    }

    /// Append a tracking event and set the new status. Returns false if the
    /// order does not exist.
    pub async fn update_order_status(
        &self,
        order_id: &str,
        status: &str,
        note: Option<String>,
    ) -> Result<bool> {
        let Some(mut order) = self.get_order(order_id).await? else {
            return Ok(false);
        };

        order.status = status.to_string();
        order.tracking.push(TrackingEvent::now(status, note));

        let db_path = self.db_path.clone();
        let order_id = order_id.to_string();
        let status = order.status.clone();
        let tracking = serde_json::to_string(&order.tracking)?;

        tokio::task::spawn_blocking(move || -> Result<bool> {
            let conn = Connection::open(&db_path)?;
            let changed = conn.execute(
                "UPDATE orders SET status = ?1, tracking = ?2, updated_at = ?3 WHERE order_id = ?4",
                params![status, tracking, Utc::now().to_rfc3339(), order_id],
            )?;
            Ok(changed > 0)
        })
        .await?
    }

    /// Most recent orders for a user, newest first.
    pub async fn orders_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<OrderRecord>> {
        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<OrderRecord>> {
            let conn = Connection::open(&db_path)?;
            let sql = format!(
                "SELECT order_id, user_id, items, total, status, tracking, created_at, updated_at
                 FROM orders WHERE user_id = ?1 ORDER BY created_at DESC LIMIT {limit}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![user_id], order_from_row)?;
            Ok(rows.flatten().collect())
        })
        .await?
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Create the profile row if the user is new.
    pub async fn upsert_user(&self, user_id: &str) -> Result<()> {
        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&db_path)?;
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT OR IGNORE INTO users (user_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![user_id, now],
            )?;
            Ok(())
        })
        .await?
    }

    /// Profile by user id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<UserProfile>> {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT user_id, language_preference, order_count, favorites, created_at, updated_at
                 FROM users WHERE user_id = ?1",
            )?;
            let mut rows = stmt.query_map(params![user_id], |row| {
                Ok(UserProfile {
                    user_id: row.get(0)?,
                    language_preference: row.get(1)?,
                    order_count: row.get::<_, i64>(2)? as u32,
                    favorites: decode_list(&row.get::<_, String>(3)?),
                    created_at: parse_ts(&row.get::<_, String>(4)?),
                    updated_at: parse_ts(&row.get::<_, String>(5)?),
                })
            })?;
            Ok(rows.next().transpose()?)
        })
        .await?
    }

    /// Bump the user's order count and merge ordered item names into their
    /// favorites.
    pub async fn record_order_for_user(&self, user_id: &str, item_names: &[String]) -> Result<()> {
        self.upsert_user(user_id).await?;

        let Some(profile) = self.get_user(user_id).await? else {
            return Ok(());
        };
        let mut favorites = profile.favorites;
        for name in item_names {
            if !favorites.contains(name) {
                favorites.push(name.clone());
            }
        }

        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();
        let favorites = serde_json::to_string(&favorites)?;

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "UPDATE users SET order_count = order_count + 1, favorites = ?1, updated_at = ?2
                 WHERE user_id = ?3",
                params![favorites, Utc::now().to_rfc3339(), user_id],
            )?;
            Ok(())
        })
        .await?
    }

    /// Remember the language the user writes in.
    pub async fn set_language_preference(&self, user_id: &str, language: &str) -> Result<()> {
        self.upsert_user(user_id).await?;

        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();
        let language = language.to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "UPDATE users SET language_preference = ?1, updated_at = ?2 WHERE user_id = ?3",
                params![language, Utc::now().to_rfc3339(), user_id],
            )?;
            Ok(())
        })
        .await?
    }
}

// ============================================================================
// Session mirror
// ============================================================================

#[async_trait]
impl SessionBackend for SqliteStore {
    async fn persist_turn(&self, user_id: &str, turn: &Turn) -> Result<()> {
        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();
        let role = turn.role.as_str().to_string();
        let content = turn.text.clone();
        let metadata = turn
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let created_at = turn.timestamp.to_rfc3339();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&db_path)?;
            conn.execute(
                "INSERT INTO chat_turns (user_id, role, content, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, role, content, metadata, created_at],
            )?;
            // Keep the mirror bounded per user.
            conn.execute(
                &format!(
                    "DELETE FROM chat_turns WHERE user_id = ?1 AND id NOT IN (
                         SELECT id FROM chat_turns WHERE user_id = ?1
                         ORDER BY id DESC LIMIT {MIRROR_KEEP}
                     )"
                ),
                params![user_id],
            )?;
            Ok(())
        })
        .await?
    }

    async fn load_turns(&self, user_id: &str) -> Result<Vec<Turn>> {
        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<Turn>> {
            let conn = Connection::open(&db_path)?;
            let mut stmt = conn.prepare(
                "SELECT role, content, metadata, created_at FROM chat_turns
                 WHERE user_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                let role: String = row.get(0)?;
                let content: String = row.get(1)?;
                let metadata: Option<String> = row.get(2)?;
                let created_at: String = row.get(3)?;
                Ok(Turn {
                    role: Role::parse(&role),
                    text: content,
                    timestamp: parse_ts(&created_at),
                    metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
                })
            })?;
            Ok(rows.flatten().collect())
        })
        .await?
    }

    async fn delete_session(&self, user_id: &str) -> Result<()> {
        let db_path = self.db_path.clone();
        let user_id = user_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(&db_path)?;
            conn.execute("DELETE FROM chat_turns WHERE user_id = ?1", params![user_id])?;
            Ok(())
        })
        .await?
    }
}

// ============================================================================
// Row decoding
// ============================================================================

fn menu_item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MenuItem> {
    Ok(MenuItem {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        price: row.get(4)?,
        tags: decode_list(&row.get::<_, String>(5)?),
        available: row.get::<_, i64>(6)? != 0,
    })
}

fn order_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderRecord> {
    Ok(OrderRecord {
        order_id: row.get(0)?,
        user_id: row.get(1)?,
        items: decode_items(&row.get::<_, String>(2)?),
        total: row.get(3)?,
        status: row.get(4)?,
        tracking: decode_tracking(&row.get::<_, String>(5)?),
        created_at: parse_ts(&row.get::<_, String>(6)?),
        updated_at: parse_ts(&row.get::<_, String>(7)?),
    })
}

fn decode_list(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

fn decode_items(json: &str) -> Vec<OrderItem> {
    serde_json::from_str(json).unwrap_or_default()
}

fn decode_tracking(json: &str) -> Vec<TrackingEvent> {
    serde_json::from_str(json).unwrap_or_default()
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn escape_fts5_query(query: &str) -> String {
    // Simple word tokenization - remove special FTS5 operators
    query
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" OR ")
}
