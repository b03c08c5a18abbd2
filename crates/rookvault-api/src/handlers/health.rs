use axum::{http::StatusCode, response::IntoResponse, Json};

pub async fn index() -> &'static str {
    "Hello, welcome to rookvault!"
}

/// Liveness probe - process is running.
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}
