//! Configuration management for the Forno services.
//!
//! Configuration is loaded from a TOML file (`forno.toml` in the working
//! directory, or the path in `FORNO_CONFIG`), with environment variables
//! taking precedence for secrets.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `FORNO_BIND_ADDRESS` → server.host
//! - `FORNO_PORT` → server.port
//! - `FORNO_DB_PATH` → store.path
//! - `FORNO_LOG_LEVEL` → observability.log_level
//! - `HF_TOKEN` → providers.hf_token
//! - `GROQ_API_KEY` → providers.groq_api_key
//! - `WHATSAPP_ACCESS_TOKEN` → whatsapp.access_token
//! - `WHATSAPP_PHONE_NUMBER_ID` → whatsapp.phone_number_id
//! - `WHATSAPP_VERIFY_TOKEN` → whatsapp.verify_token

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    std::env::var("FORNO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("forno.toml"))
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Default: "0.0.0.0"
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port. Default: 8000
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8000
}

// ============================================================================
// Store Configuration
// ============================================================================

/// SQLite store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file path. Default: "data/forno.db"
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Mirror chat sessions into the store so they survive restarts.
    /// Default: true
    #[serde(default = "default_persist_sessions")]
    pub persist_sessions: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            persist_sessions: default_persist_sessions(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/forno.db")
}

fn default_persist_sessions() -> bool {
    true
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Conversation session limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Max turns kept per user; oldest evicted first. Default: 25
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Idle minutes before a session expires. Default: 30
    #[serde(default = "default_expiry_minutes")]
    pub expiry_minutes: i64,

    /// How many recent turns the summary is computed from. Default: 8
    #[serde(default = "default_summary_turns")]
    pub summary_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            expiry_minutes: default_expiry_minutes(),
            summary_turns: default_summary_turns(),
        }
    }
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

// ============================================================================
// Provider Configuration
// ============================================================================

/// Text-generation provider configuration.
///
/// Providers are tried in `order`; each is retried with exponential backoff
/// before falling through to the next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Preference order. Known names: "groq", "huggingface". Default: both.
    #[serde(default = "default_provider_order")]
    pub order: Vec<String>,

    /// Hugging Face Inference API token (env: HF_TOKEN).
    #[serde(default)]
    pub hf_token: Option<String>,

    /// Hugging Face model id. Default: "mistralai/Mistral-7B-Instruct-v0.2"
    #[serde(default = "default_hf_model")]
    pub hf_model: String,

    /// Groq API key (env: GROQ_API_KEY).
    #[serde(default)]
    pub groq_api_key: Option<String>,

    /// Groq model id. Default: "llama-3.1-70b-versatile"
    #[serde(default = "default_groq_model")]
    pub groq_model: String,

    /// Max tokens per completion. Default: 512
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature. Default: 0.7
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Per-request timeout in seconds. Default: 30
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries per provider before falling through. Default: 2
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: default_provider_order(),
            hf_token: None,
            hf_model: default_hf_model(),
            groq_api_key: None,
            groq_model: default_groq_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider_order() -> Vec<String> {
    vec!["groq".into(), "huggingface".into()]
}

fn default_hf_model() -> String {
    "mistralai/Mistral-7B-Instruct-v0.2".into()
}

fn default_groq_model() -> String {
    "llama-3.1-70b-versatile".into()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f64 {
    0.7
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

// ============================================================================
// WhatsApp Configuration
// ============================================================================

/// WhatsApp Business Cloud API configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WhatsAppConfig {
    /// Enable the WhatsApp webhook routes. Default: false
    #[serde(default)]
    pub enabled: bool,

    /// Graph API access token (env: WHATSAPP_ACCESS_TOKEN).
    #[serde(default)]
    pub access_token: Option<String>,

    /// Business phone number id (env: WHATSAPP_PHONE_NUMBER_ID).
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Webhook verification token (env: WHATSAPP_VERIFY_TOKEN).
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Allowed sender numbers; empty allows everyone.
    #[serde(default)]
    pub allowed_numbers: Vec<String>,
}

// ============================================================================
// Agent Configuration
// ============================================================================

/// Dialogue agent knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Include raw recent turns in the generation prompt. Default: true
    #[serde(default = "default_include_raw_turns")]
    pub include_raw_turns: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            include_raw_turns: default_include_raw_turns(),
        }
    }
}

fn default_include_raw_turns() -> bool {
    true
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level. Default: "info"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "pretty" or "json". Default: "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for all Forno services.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("FORNO_BIND_ADDRESS") {
            self.server.host = bind;
        }
        if let Ok(port) = std::env::var("FORNO_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(path) = std::env::var("FORNO_DB_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Ok(level) = std::env::var("FORNO_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Ok(token) = std::env::var("HF_TOKEN") {
            self.providers.hf_token = Some(token);
        }
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            self.providers.groq_api_key = Some(key);
        }

        if let Ok(token) = std::env::var("WHATSAPP_ACCESS_TOKEN") {
            self.whatsapp.access_token = Some(token);
        }
        if let Ok(id) = std::env::var("WHATSAPP_PHONE_NUMBER_ID") {
            self.whatsapp.phone_number_id = Some(id);
        }
        if let Ok(token) = std::env::var("WHATSAPP_VERIFY_TOKEN") {
            self.whatsapp.verify_token = Some(token);
        }
    }
}
