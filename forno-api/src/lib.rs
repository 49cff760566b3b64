//! forno-api - HTTP surface for the Forno pizza assistant.
//!
//! Chat, menu browsing, order lookup, session management, and the
//! WhatsApp webhook all live behind one axum router over shared state.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod error;
pub mod routes;
pub mod seed;

pub use error::ApiError;
pub use routes::{build_router, AppState};
pub use seed::seed_if_empty;
