use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /health: liveness plus the configured automation endpoint.
pub async fn health(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "message": "OpenSpec workflow API is running",
        "githubApiEndpoint": app.config.github_api_endpoint,
    }))
}
