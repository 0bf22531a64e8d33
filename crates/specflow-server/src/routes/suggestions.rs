use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use specflow_core::spec_tree::{self, SpecPatch};
use specflow_core::SpecflowError;
use specflow_remote::{suggest_or_fallback, SuggestionPrompt};

use super::optional_json;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, serde::Deserialize)]
pub struct SuggestionBody {
    pub context: Option<String>,
    pub requirement: Option<String>,
}

/// POST /api/openspec/projects/:project_id/specs/:spec_id/suggestions:
/// replace the node's suggestions. The AI service failing is not an error
/// here; the fallback pair is stored instead.
pub async fn generate_suggestions(
    State(app): State<AppState>,
    Path((project_id, spec_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let body: SuggestionBody = optional_json(&body)?;

    let prompt = {
        let projects = app.projects.lock().await;
        let project = projects.get(&project_id)?;
        let spec = spec_tree::find(&project.spec_tree, &spec_id)
            .ok_or_else(|| SpecflowError::SpecNotFound(spec_id.clone()))?;
        SuggestionPrompt {
            project_name: project.project_name.clone(),
            content: spec.content.clone(),
            context: body.context,
            requirement: body.requirement,
        }
    };

    let suggestions = suggest_or_fallback(app.suggestions.as_ref(), &prompt).await;

    app.projects.lock().await.with_tree_mut(&project_id, |tree| {
        spec_tree::update(tree, &spec_id, SpecPatch::suggestions(suggestions.clone())).map(|_| ())
    })?;
    tracing::info!(project_id = %project_id, spec_id = %spec_id, count = suggestions.len(), "suggestions attached");

    Ok(Json(serde_json::json!({
        "success": true,
        "suggestions": suggestions,
    })))
}
