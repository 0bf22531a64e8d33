use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use specflow_core::bundle::{self, Layout};
use specflow_core::project::{self, BundleInfo, NewProject};

use super::optional_json;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/openspec/projects: all projects, oldest first.
pub async fn list_projects(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let projects = app.projects.lock().await;
    Ok(Json(serde_json::json!({
        "success": true,
        "projects": projects.list(),
    })))
}

/// POST /api/openspec/projects: create a project.
pub async fn create_project(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let body: NewProject = optional_json(&body)?;
    let project = app.projects.lock().await.create(body)?;
    tracing::info!(project_id = %project.id, name = %project.project_name, "project created");
    Ok(Json(serde_json::json!({
        "success": true,
        "projectId": project.id,
        "project": project,
    })))
}

/// GET /api/openspec/projects/:project_id
pub async fn get_project(
    State(app): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let projects = app.projects.lock().await;
    let project = projects.get(&project_id)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "project": project,
    })))
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
    pub layout: Option<Layout>,
}

/// POST /api/openspec/projects/:project_id/upload: the raw archive is the
/// request body.
pub async fn upload_bundle(
    State(app): State<AppState>,
    Path(project_id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    app.projects.lock().await.get(&project_id)?;

    if let Some(name) = &query.filename {
        bundle::check_file_name(name)?;
    }
    if body.is_empty() {
        return Err(AppError::bad_request("request body must contain a .zip archive"));
    }

    let layout = query.layout.unwrap_or_default();
    let limits = app.config.bundle_limits();
    let bytes = body.clone();
    let (report, tree) =
        tokio::task::spawn_blocking(move || bundle::ingest(&bytes, layout, &limits))
            .await
            .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let info = BundleInfo {
        name: query.filename.unwrap_or_else(|| "bundle.zip".to_string()),
        size_bytes: body.len() as u64,
        uploaded_at: Utc::now(),
    };
    let mut projects = app.projects.lock().await;
    let project = projects.attach_bundle(&project_id, tree, info)?;
    let documents = specflow_core::spec_tree::documents(&project.spec_tree).len();
    tracing::info!(project_id = %project_id, documents, ?layout, "bundle uploaded");

    Ok(Json(serde_json::json!({
        "success": true,
        "specTree": project.spec_tree,
        "validation": report,
        "message": format!("Uploaded {documents} specification document(s)"),
    })))
}

/// GET /api/openspec/projects/:project_id/suggested-branch
pub async fn suggested_branch(
    State(app): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let projects = app.projects.lock().await;
    let project = projects.get(&project_id)?;
    Ok(Json(serde_json::json!({
        "success": true,
        "branchName": project::suggested_branch(project, Utc::now()),
    })))
}
