//! HTTP surface — the Z-API webhook plus health and diagnostic routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::cpf;
use crate::engine::Engine;
use crate::store::ConversationStore;
use crate::zapi::ZapiClient;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub store: Arc<dyn ConversationStore>,
    pub gateway: Arc<ZapiClient>,
    pub safra_configured: bool,
}

/// Build the application router. Z-API can be pointed at either the
/// root or `/webhook`; both accept events.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/", post(handle_webhook))
        .route("/health", get(health))
        .route("/test-cpf", post(test_cpf))
        .with_state(state)
}

/// Inbound Z-API message event. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(default)]
    phone: String,
    #[serde(default)]
    text: Option<TextBody>,
    #[serde(rename = "fromMe", default)]
    from_me: bool,
}

#[derive(Debug, Deserialize)]
struct TextBody {
    #[serde(default)]
    message: String,
}

async fn handle_webhook(
    State(state): State<AppState>,
    Json(event): Json<WebhookEvent>,
) -> Response {
    let text = event
        .text
        .as_ref()
        .map(|t| t.message.trim())
        .unwrap_or_default();

    // Self-sent echoes and empty events are acknowledged, never processed.
    if event.from_me || event.phone.is_empty() || text.is_empty() {
        return Json(json!({"status": "ignored"})).into_response();
    }

    info!(phone = %event.phone, "Webhook message received");

    match process_event(&state, &event.phone, text).await {
        Ok(()) => Json(json!({"status": "ok"})).into_response(),
        Err(e) => {
            error!(phone = %event.phone, error = %e, "Webhook handling failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error"})),
            )
                .into_response()
        }
    }
}

/// Run the engine for one event and deliver the reply.
///
/// The engine commits the event (conversation plus message records)
/// atomically before this sends anything; delivery is best-effort and
/// never retried, so the records stand for attempts, not receipts.
async fn process_event(
    state: &AppState,
    phone: &str,
    text: &str,
) -> Result<(), crate::error::DatabaseError> {
    let reply = state.engine.process_message(phone, text).await?;

    if let Some(notice) = &reply.wait_notice {
        state.gateway.send_message(phone, notice).await;
    }
    if !state.gateway.send_message(phone, &reply.text).await {
        error!(phone, "Failed to deliver reply");
    }
    Ok(())
}

async fn health(State(state): State<AppState>) -> Response {
    let database = match state.store.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("disconnected: {e}"),
    };

    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "database": database,
        "zapi_configured": state.gateway.is_configured(),
        "safra_configured": state.safra_configured,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct TestCpfRequest {
    #[serde(default)]
    cpf: String,
}

/// Validates a CPF without touching any conversation.
async fn test_cpf(Json(request): Json<TestCpfRequest>) -> Response {
    let valid = cpf::is_valid(&cpf::clean(&request.cpf));
    let message = if valid { "CPF válido." } else { "CPF inválido." };
    Json(json!({"valid": valid, "message": message})).into_response()
}
