//! HTTP request handlers

use super::types::{ErrorResponse, HealthResponse, Update, ValidationError, WebhookAck};
use super::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

/// Header Telegram sets when the webhook was registered with a secret
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

/// Receive one Telegram update.
///
/// Anything that is not a usable private text message is acknowledged and
/// dropped: a non-2xx answer would only make Telegram redeliver it.
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    if let Some(expected) = &state.webhook_secret {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            tracing::warn!("Rejected webhook call with missing or wrong secret");
            return Err(AppError::Unauthorized);
        }
    }

    let inbound = serde_json::from_slice::<Update>(&body)
        .map_err(|e| ValidationError::Malformed(e.to_string()))
        .and_then(Update::into_inbound);

    match inbound {
        Ok(event) => {
            state.handler.handle_inbound(&event).await;
            Ok(Json(WebhookAck {
                ok: true,
                handled: true,
            }))
        }
        Err(e) => {
            tracing::debug!(reason = %e, "Ignoring update");
            Ok(Json(WebhookAck {
                ok: true,
                handled: false,
            }))
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid webhook secret"),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
