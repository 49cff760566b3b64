//! forno-api service entry point.

use anyhow::Result;
use forno_agent::{Dispatcher, DispatcherConfig};
use forno_api::{build_router, seed_if_empty, AppState};
use forno_channels::WhatsAppChannel;
use forno_common::config::{AppConfig, WhatsAppConfig};
use forno_common::logging::init_logging;
use forno_gateway::build_chain;
use forno_session::{MemoryConfig, SessionBackend, SessionMemory, Vocabulary};
use forno_store::SqliteStore;
use forno_tools::{
    KbSearchTool, MenuSearchTool, OrderStatusTool, RecommendTool, SqliteOrderBackend, Tool,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    let config = AppConfig::load_with_env()?;
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Forno API v{}", env!("CARGO_PKG_VERSION"));

    // Storage and seed data
    let store = Arc::new(SqliteStore::open(&config.store.path)?);
    seed_if_empty(&store).await?;

    // Model provider chain
    let provider = Arc::new(build_chain(&config.providers)?);

    // Session memory, optionally persisted through the store
    let backend = config
        .store
        .persist_sessions
        .then(|| store.clone() as Arc<dyn SessionBackend>);
    let memory = Arc::new(SessionMemory::new(
        MemoryConfig {
            capacity: config.session.capacity,
            expiry_minutes: config.session.expiry_minutes,
            summary_turns: config.session.summary_turns,
            vocabulary: Vocabulary::default(),
        },
        backend,
    ));

    // Tools and the order backend
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(MenuSearchTool::new(store.clone())),
        Arc::new(KbSearchTool::new(store.clone())),
        Arc::new(OrderStatusTool::new(store.clone())),
        Arc::new(RecommendTool::new(store.clone())),
    ];
    let order_backend = Arc::new(SqliteOrderBackend::new(store.clone()));

    let dispatcher = Arc::new(Dispatcher::new(
        provider,
        tools,
        order_backend,
        memory.clone(),
        DispatcherConfig {
            max_tokens: config.providers.max_tokens,
            temperature: config.providers.temperature,
            include_raw_turns: config.agent.include_raw_turns,
            ..DispatcherConfig::default()
        },
    ));

    let whatsapp = build_whatsapp_channel(&config.whatsapp);

    let state = AppState {
        store,
        memory,
        dispatcher,
        whatsapp,
    };

    // Build router with CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = build_router(state).layer(cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the WhatsApp channel when it is enabled and fully configured.
fn build_whatsapp_channel(config: &WhatsAppConfig) -> Option<Arc<WhatsAppChannel>> {
    if !config.enabled {
        return None;
    }

    let (Some(access_token), Some(phone_number_id), Some(verify_token)) = (
        config.access_token.clone(),
        config.phone_number_id.clone(),
        config.verify_token.clone(),
    ) else {
        tracing::warn!("WhatsApp channel enabled but credentials are incomplete; disabling");
        return None;
    };

    // An empty allow list in config means no restriction.
    let allowed_numbers = if config.allowed_numbers.is_empty() {
        vec!["*".to_string()]
    } else {
        config.allowed_numbers.clone()
    };

    tracing::info!(phone_number_id = %phone_number_id, "WhatsApp channel enabled");
    Some(Arc::new(WhatsAppChannel::new(
        access_token,
        phone_number_id,
        verify_token,
        allowed_numbers,
    )))
}
