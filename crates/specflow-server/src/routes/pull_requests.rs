use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use specflow_core::project::DEFAULT_BRANCH_BASE;
use specflow_remote::CreatePullRequest;

use super::optional_json;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub source_branch: Option<String>,
    pub branch_name: Option<String>,
    pub target_branch: Option<String>,
}

/// POST /api/openspec/projects/:project_id/pull-request: open a pull request
/// from the generated branch. Remote failures are returned to the caller.
pub async fn create_pull_request(
    State(app): State<AppState>,
    Path(project_id): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let body: PullRequestBody = optional_json(&body)?;
    let (owner, repo) = {
        let projects = app.projects.lock().await;
        let project = projects.get(&project_id)?;
        (project.owner.clone(), project.repository.clone())
    };
    if body.title.trim().is_empty() {
        return Err(AppError::bad_request("missing required field(s): title"));
    }

    let head = body
        .source_branch
        .or(body.branch_name)
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BRANCH_BASE.to_string());
    let base = body
        .target_branch
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| app.config.default_branch.clone());

    let request = CreatePullRequest {
        owner,
        repo,
        title: body.title,
        body: body.body,
        head,
        base,
    };
    let pull_request = app.automation.create_pull_request(&request).await?;
    tracing::info!(project_id = %project_id, head = %request.head, base = %request.base, "pull request created");

    Ok(Json(serde_json::json!({
        "success": true,
        "pullRequest": pull_request,
        "message": "Pull request created successfully",
    })))
}
