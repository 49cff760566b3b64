//! Forno Common - Shared configuration and logging for the Forno services.
//!
//! This crate provides:
//! - Configuration types and loading (TOML file + environment overrides)
//! - Logging setup with noise suppression for chatty HTTP crates

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;

pub use config::{
    AgentConfig, AppConfig, ObservabilityConfig, ProvidersConfig, ServerConfig, SessionConfig,
    StoreConfig, WhatsAppConfig,
};
pub use logging::init_logging;
