//! HTTP API routes.

use crate::error::ApiError;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use forno_agent::Dispatcher;
use forno_channels::{clean_for_whatsapp, WhatsAppChannel};
use forno_session::{detect_language, SessionMemory};
use forno_store::SqliteStore;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Page cap for the full menu listing.
const MENU_PAGE: usize = 100;

/// How many past orders the per-user listing returns.
const USER_ORDERS_LIMIT: usize = 10;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub memory: Arc<SessionMemory>,
    pub dispatcher: Arc<Dispatcher>,
    /// Present only when the WhatsApp channel is configured.
    pub whatsapp: Option<Arc<WhatsAppChannel>>,
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Conversation
        .route("/chat", post(chat))
        .route("/chat/session/:user_id", get(get_session))
        .route("/chat/session/:user_id", delete(clear_session))
        // Menu
        .route("/menu", get(list_menu))
        .route("/menu/search", get(search_menu))
        // Orders
        .route("/orders/:order_id", get(get_order))
        .route("/orders/user/:user_id", get(user_orders))
        // WhatsApp webhook
        .route("/whatsapp/webhook", get(whatsapp_verify))
        .route("/whatsapp/webhook", post(whatsapp_inbound))
        .with_state(state)
}

// ============ Health Check ============

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "forno-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============ Conversation ============

#[derive(Debug, Deserialize)]
struct ChatRequest {
    user_id: String,
    message: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = request.user_id.trim();
    let message = request.message.trim();
    if user_id.is_empty() {
        return Err(ApiError::InvalidRequest("user_id must not be empty".into()));
    }
    if message.is_empty() {
        return Err(ApiError::InvalidRequest("message must not be empty".into()));
    }

    let language = detect_language(message, state.memory.vocabulary());
    let outcome = state.dispatcher.handle_message(user_id, message).await;

    // Best effort; the reply stands even if the profile write fails.
    if let Err(e) = state
        .store
        .set_language_preference(user_id, language.as_str())
        .await
    {
        tracing::warn!(user_id, error = %e, "Failed to persist language preference");
    }

    Ok(Json(json!({
        "success": true,
        "data": {
            "reply": outcome.reply,
            "tool_used": outcome.tool_used,
            "language": language.as_str(),
            "status": outcome.status.as_str(),
        }
    })))
}

async fn get_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let turns = state.memory.get_turns(&user_id, None).await;
    let summary = state.memory.compress(&user_id).await;

    Json(json!({
        "success": true,
        "data": {
            "user_id": user_id,
            "turns": turns,
            "summary": summary,
        }
    }))
}

async fn clear_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    state.memory.clear(&user_id).await;
    Json(json!({ "success": true }))
}

// ============ Menu ============

#[derive(Debug, Deserialize)]
struct MenuQuery {
    category: Option<String>,
}

async fn list_menu(
    State(state): State<AppState>,
    Query(query): Query<MenuQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let items = match query.category.as_deref() {
        Some(category) => state.store.menu_by_category(category).await?,
        None => state.store.all_menu_items(MENU_PAGE).await?,
    };

    Ok(Json(json!({
        "success": true,
        "data": { "items": items, "count": items.len() }
    })))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search_menu(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.is_empty() {
        return Err(ApiError::InvalidRequest(
            "query parameter 'q' is required".into(),
        ));
    }

    let items = state.store.search_menu(q).await?;
    Ok(Json(json!({
        "success": true,
        "data": { "items": items, "count": items.len(), "query": q }
    })))
}

// ============ Orders ============

async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .store
        .get_order(&order_id)
        .await?
        .ok_or(ApiError::OrderNotFound(order_id))?;

    Ok(Json(json!({ "success": true, "data": order })))
}

async fn user_orders(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .store
        .orders_for_user(&user_id, USER_ORDERS_LIMIT)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": { "orders": orders, "count": orders.len() }
    })))
}

// ============ WhatsApp Webhook ============

async fn whatsapp_verify(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<String, ApiError> {
    let channel = state.whatsapp.as_ref().ok_or(ApiError::ChannelDisabled)?;

    let get = |key: &str| params.get(key).map(String::as_str).unwrap_or_default();

    channel
        .verify_webhook(get("hub.mode"), get("hub.verify_token"), get("hub.challenge"))
        .ok_or(ApiError::WebhookVerificationFailed)
}

/// Process inbound WhatsApp messages.
///
/// Always answers 200. Meta retries on any other status, and a retry
/// storm of the same message is worse than a dropped reply.
async fn whatsapp_inbound(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    let Some(channel) = state.whatsapp.as_ref() else {
        return Json(json!({ "success": true, "received": 0 }));
    };

    let messages = channel.parse_webhook_payload(&payload);
    let received = messages.len();

    for message in messages {
        let outcome = state
            .dispatcher
            .handle_message(&message.from, &message.text)
            .await;
        let reply = clean_for_whatsapp(&outcome.reply);
        if let Err(e) = channel.send_text(&message.from, &reply).await {
            tracing::error!(user_id = %message.from, error = %e, "Failed to send WhatsApp reply");
        }
    }

    Json(json!({ "success": true, "received": received }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use forno_agent::DispatcherConfig;
    use forno_gateway::{Generation, GenerationRequest, Provider, ProviderError};
    use forno_session::MemoryConfig;
    use forno_store::{OrderRecord, TrackingEvent};
    use forno_tools::{MenuSearchTool, SqliteOrderBackend, Tool};
    use tower::ServiceExt;

    struct CannedProvider {
        response: String,
    }

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn generate(&self, _request: GenerationRequest) -> Result<Generation, ProviderError> {
            Ok(Generation {
                provider: "canned".to_string(),
                model: "test-model".to_string(),
                text: self.response.clone(),
                latency_ms: 1,
            })
        }
    }

    fn test_state(dir: &tempfile::TempDir, canned_reply: &str) -> AppState {
        let store = Arc::new(SqliteStore::open(&dir.path().join("api.db")).unwrap());
        let memory = Arc::new(SessionMemory::new(MemoryConfig::default(), None));
        let provider = Arc::new(CannedProvider {
            response: canned_reply.to_string(),
        });
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(MenuSearchTool::new(store.clone()))];
        let order_backend = Arc::new(SqliteOrderBackend::new(store.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            provider,
            tools,
            order_backend,
            memory.clone(),
            DispatcherConfig::default(),
        ));
        AppState {
            store,
            memory,
            dispatcher,
            whatsapp: None,
        }
    }

    /// Channel pointed at a closed local port so sends fail fast instead
    /// of reaching the real Graph API.
    fn with_whatsapp(mut state: AppState) -> AppState {
        let channel = WhatsAppChannel::new(
            "tok".into(),
            "1234".into(),
            "verify-me".into(),
            vec!["*".into()],
        )
        .with_base_url("http://127.0.0.1:9");
        state.whatsapp = Some(Arc::new(channel));
        state
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_the_service() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = build_router(test_state(&dir, "{}"));

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "forno-api");
    }

    #[tokio::test]
    async fn chat_round_trip_returns_the_reply() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = build_router(test_state(&dir, r#"{"reply": "Hi! Want a pizza? 🍕"}"#));

        let response = app
            .oneshot(post_json("/chat", r#"{"user_id": "u1", "message": "hello"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["reply"], "Hi! Want a pizza? 🍕");
        assert_eq!(body["data"]["language"], "english");
        assert_eq!(body["data"]["status"], "success");
    }

    #[tokio::test]
    async fn chat_rejects_blank_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = build_router(test_state(&dir, "{}"));

        let response = app
            .oneshot(post_json("/chat", r#"{"user_id": "u1", "message": "   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_tags_romanized_messages() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = build_router(test_state(&dir, r#"{"reply": "Here you go!"}"#));

        let response = app
            .oneshot(post_json(
                "/chat",
                r#"{"user_id": "u1", "message": "mujhe pizza dikhao"}"#,
            ))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["data"]["language"], "romanized");
    }

    #[tokio::test]
    async fn session_returns_recorded_turns_and_summary() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = test_state(&dir, r#"{"reply": "Hello yourself!"}"#);
        let app = build_router(state);

        app.clone()
            .oneshot(post_json("/chat", r#"{"user_id": "u1", "message": "hello"}"#))
            .await
            .unwrap();

        let response = app.oneshot(get("/chat/session/u1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let turns = body["data"]["turns"].as_array().unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(body["data"]["summary"]["message_count"], 2);
    }

    #[tokio::test]
    async fn clearing_a_session_empties_its_history() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = build_router(test_state(&dir, r#"{"reply": "Hi!"}"#));

        app.clone()
            .oneshot(post_json("/chat", r#"{"user_id": "u1", "message": "hello"}"#))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/chat/session/u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(app.oneshot(get("/chat/session/u1")).await.unwrap()).await;
        assert!(body["data"]["turns"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn menu_lists_seeded_items_and_filters_by_category() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = test_state(&dir, "{}");
        crate::seed::seed_if_empty(&state.store).await.unwrap();
        let app = build_router(state);

        let body = body_json(app.clone().oneshot(get("/menu")).await.unwrap()).await;
        assert_eq!(body["data"]["count"], 10);

        let body = body_json(app.oneshot(get("/menu?category=veg")).await.unwrap()).await;
        let items = body["data"]["items"].as_array().unwrap();
        assert!(!items.is_empty());
        assert!(items.iter().all(|i| i["category"] == "veg"));
    }

    #[tokio::test]
    async fn menu_search_requires_a_query() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = test_state(&dir, "{}");
        crate::seed::seed_if_empty(&state.store).await.unwrap();
        let app = build_router(state);

        let response = app.clone().oneshot(get("/menu/search")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(
            app.oneshot(get("/menu/search?q=pepperoni")).await.unwrap(),
        )
        .await;
        assert!(body["data"]["count"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn missing_order_is_a_404() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = build_router(test_state(&dir, "{}"));

        let response = app.oneshot(get("/orders/ORD-00000000-0000")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "ORDER_NOT_FOUND");
    }

    #[tokio::test]
    async fn stored_orders_are_served_by_id_and_by_user() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = test_state(&dir, "{}");

        let now = chrono::Utc::now();
        state
            .store
            .insert_order(&OrderRecord {
                order_id: "ORD-20250101-7777".to_string(),
                user_id: "u9".to_string(),
                items: vec![],
                total: 12.99,
                status: "created".to_string(),
                tracking: vec![TrackingEvent::now("created", None)],
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let app = build_router(state);

        let body = body_json(
            app.clone()
                .oneshot(get("/orders/ORD-20250101-7777"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["data"]["order_id"], "ORD-20250101-7777");

        let body = body_json(app.oneshot(get("/orders/user/u9")).await.unwrap()).await;
        assert_eq!(body["data"]["count"], 1);
    }

    #[tokio::test]
    async fn whatsapp_verification_echoes_the_challenge() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = build_router(with_whatsapp(test_state(&dir, "{}")));

        let response = app
            .oneshot(get(
                "/whatsapp/webhook?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=12345",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"12345");
    }

    #[tokio::test]
    async fn whatsapp_verification_rejects_a_bad_token() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = build_router(with_whatsapp(test_state(&dir, "{}")));

        let response = app
            .oneshot(get(
                "/whatsapp/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=12345",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn whatsapp_routes_are_unavailable_without_a_channel() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = build_router(test_state(&dir, "{}"));

        let response = app
            .oneshot(get("/whatsapp/webhook?hub.mode=subscribe"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn whatsapp_inbound_answers_ok_even_when_the_send_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = build_router(with_whatsapp(test_state(&dir, r#"{"reply": "On it!"}"#)));

        let payload = r#"{
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "15550001111",
                            "id": "wamid.t1",
                            "type": "text",
                            "text": { "body": "hello" }
                        }]
                    }
                }]
            }]
        }"#;

        let response = app
            .oneshot(post_json("/whatsapp/webhook", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["received"], 1);
    }

    #[tokio::test]
    async fn whatsapp_status_payloads_are_acknowledged_quietly() {
        let dir = tempfile::TempDir::new().unwrap();
        let app = build_router(with_whatsapp(test_state(&dir, "{}")));

        let payload = r#"{
            "entry": [{
                "changes": [{
                    "value": {
                        "statuses": [{ "id": "wamid.t1", "status": "delivered" }]
                    }
                }]
            }]
        }"#;

        let response = app
            .oneshot(post_json("/whatsapp/webhook", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["received"], 0);
    }
}
