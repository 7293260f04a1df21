//! Health and liveness endpoint handlers.
//!
//! Both routes are public: the default policy permits `/health/**` before
//! any identity is required.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Reports readiness and uptime.
///
/// Answers 503 with `"state": "draining"` once graceful shutdown has begun,
/// so load balancers stop routing new requests here.
pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let (status, label) = if state.is_draining() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ready")
    };
    let body = json!({
        "state": label,
        "uptime_secs": state.start_time.elapsed().as_secs(),
    });
    (status, Json(body))
}

/// Liveness probe -- always returns 200 OK.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}
