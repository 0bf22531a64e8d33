use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use specflow_core::spec_tree::{self, SpecPatch};
use specflow_core::SpecflowError;

use super::optional_json;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/openspec/projects/:project_id/specs/:spec_id
pub async fn get_spec(
    State(app): State<AppState>,
    Path((project_id, spec_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let projects = app.projects.lock().await;
    let project = projects.get(&project_id)?;
    let spec = spec_tree::find(&project.spec_tree, &spec_id)
        .ok_or_else(|| SpecflowError::SpecNotFound(spec_id.clone()))?;
    Ok(Json(serde_json::json!({
        "success": true,
        "spec": spec,
    })))
}

/// PUT /api/openspec/projects/:project_id/specs/:spec_id: partial update;
/// absent fields are left as they are.
pub async fn update_spec(
    State(app): State<AppState>,
    Path((project_id, spec_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let patch: SpecPatch = optional_json(&body)?;
    let spec = app.projects.lock().await.with_tree_mut(&project_id, |tree| {
        spec_tree::update(tree, &spec_id, patch).cloned()
    })?;
    tracing::debug!(project_id = %project_id, spec_id = %spec_id, "specification updated");
    Ok(Json(serde_json::json!({
        "success": true,
        "spec": spec,
    })))
}
