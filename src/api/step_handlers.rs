//! Step API handlers

use crate::api::extractor::CurrentUser;
use crate::api::project_handlers::owned_project;
use crate::store::{Step, StepPatch, StepStatus};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::handlers::{AppError, SharedState};

/// Client-side step changes. Marking a step completed, failed or pending
/// again is how users drive progress; completions fire the triggers.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateStepRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<StepStatus>,
    /// Set to false to let automation run again
    pub automation_attempted: Option<bool>,
}

/// List a project's steps in order
pub async fn list_steps(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Step>>, AppError> {
    owned_project(&state, &user, project_id).await?;
    Ok(Json(state.store.list_steps(project_id).await?))
}

/// Get a single step
pub async fn get_step(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path((project_id, step_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Step>, AppError> {
    owned_project(&state, &user, project_id).await?;
    state
        .store
        .get_step(project_id, step_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Step {} not found", step_id)))
}

/// Update a step
pub async fn update_step(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path((project_id, step_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateStepRequest>,
) -> Result<Json<Step>, AppError> {
    owned_project(&state, &user, project_id).await?;

    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("Step title is required".to_string()));
        }
    }

    let patch = StepPatch {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description.map(|d| d.trim().to_string()),
        status: req.status,
        automation_attempted: req.automation_attempted,
        automation_result: None,
    };
    let step = state.store.update_step(project_id, step_id, &patch).await?;
    tracing::debug!(project_id = %project_id, step_id = %step_id, status = step.status.as_str(), "Step updated");
    Ok(Json(step))
}
