//! Forno Tools - the assistant's capability system.
//!
//! Provides a trait-based tool system for the pizza agent:
//! - Menu search and browsing
//! - Knowledge-base lookup (hours, policies, allergens)
//! - Order status with tracking timeline
//! - Recommendations from order history
//!
//! Order placement is not a tool. It goes through the typed
//! [`OrderBackend`] seam so the dispatcher can gate it behind an explicit
//! user confirmation.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod kb;
pub mod menu;
pub mod order;
pub mod recommend;
pub mod status;
pub mod traits;

pub use traits::{Tool, ToolResult, ToolSpec};

pub use kb::KbSearchTool;
pub use menu::MenuSearchTool;
pub use order::{OrderBackend, OrderError, OrderReceipt, SqliteOrderBackend};
pub use recommend::RecommendTool;
pub use status::OrderStatusTool;
