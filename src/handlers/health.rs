use axum::response::Json;
use serde_json::{json, Value};

/// Liveness probe. Reports the service name and version so a deploy can be
/// verified from the outside.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
