use axum::extract::{Path, State};
use axum::Json;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/openspec/projects/:project_id/branches: the repository's branches
/// as reported by the automation proxy.
pub async fn list_branches(
    State(app): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (owner, repo) = {
        let projects = app.projects.lock().await;
        let project = projects.get(&project_id)?;
        (project.owner.clone(), project.repository.clone())
    };
    let branches = app.automation.get_branches(&owner, &repo).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "branches": branches,
    })))
}
