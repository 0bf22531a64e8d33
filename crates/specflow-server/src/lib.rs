pub mod error;
pub mod generation;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Uploaded bundles can be larger than axum's default 2 MB body limit.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
}

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(routes::health::health))
        // Projects
        .route(
            "/api/openspec/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/api/openspec/projects/{project_id}",
            get(routes::projects::get_project),
        )
        .route(
            "/api/openspec/projects/{project_id}/upload",
            post(routes::projects::upload_bundle),
        )
        .route(
            "/api/openspec/projects/{project_id}/suggested-branch",
            get(routes::projects::suggested_branch),
        )
        // Specifications
        .route(
            "/api/openspec/projects/{project_id}/specs/{spec_id}",
            get(routes::specs::get_spec).put(routes::specs::update_spec),
        )
        .route(
            "/api/openspec/projects/{project_id}/specs/{spec_id}/suggestions",
            post(routes::suggestions::generate_suggestions),
        )
        // Generation
        .route(
            "/api/openspec/projects/{project_id}/generate",
            post(routes::generate::start_generation),
        )
        .route(
            "/api/openspec/projects/{project_id}/tasks",
            get(routes::tasks::list_project_tasks),
        )
        .route(
            "/api/openspec/tasks/{task_id}/status",
            get(routes::tasks::get_task_status),
        )
        // Repository
        .route(
            "/api/openspec/projects/{project_id}/branches",
            get(routes::branches::list_branches),
        )
        .route(
            "/api/openspec/projects/{project_id}/pull-request",
            post(routes::pull_requests::create_pull_request),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the server on `host:port` from the state's config.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(state, listener).await
}

/// Start the server on a pre-bound listener.
///
/// Used by tests and callers that bind port 0 to get an OS-assigned port.
pub async fn serve_on(state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(state);

    tracing::info!("specflow server listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
