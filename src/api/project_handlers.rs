//! Project API handlers

use crate::api::extractor::CurrentUser;
use crate::store::{Project, ProjectPatch, ProjectStatus, Step};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::handlers::{AppError, SharedState};

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<CreateStepRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStepRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub automatable: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub steps: Vec<Step>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Load a project owned by `user`. Other users' projects look missing.
pub(crate) async fn owned_project(
    state: &SharedState,
    user: &CurrentUser,
    project_id: Uuid,
) -> Result<Project, AppError> {
    state
        .store
        .get_project(project_id)
        .await?
        .filter(|p| p.user_id == user.0)
        .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a project together with its ordered steps
pub async fn create_project(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectDetail>), AppError> {
    let title = required(&req.title, "Project title")?;
    let mut drafts = Vec::with_capacity(req.steps.len());
    for (index, step) in req.steps.iter().enumerate() {
        let step_title = required(&step.title, &format!("Step {} title", index + 1))?;
        drafts.push((step_title, step));
    }

    let project = Project::new(
        user.0.clone(),
        title,
        optional_text(req.description.as_deref()),
        drafts.len() as u32,
    );
    state.store.create_project(&project).await?;

    let steps: Vec<Step> = drafts
        .into_iter()
        .enumerate()
        .map(|(order, (step_title, draft))| {
            Step::new(
                project.id,
                order as u32,
                step_title,
                optional_text(draft.description.as_deref()).unwrap_or_default(),
                draft.automatable,
            )
        })
        .collect();

    // Last step first: the first step's create trigger may automate and
    // complete it, and the progress recount must already see every sibling.
    for step in steps.iter().rev() {
        state.store.create_step(step).await?;
    }

    tracing::info!(project_id = %project.id, user_id = %user.0, steps = steps.len(), "Project created");
    Ok((StatusCode::CREATED, Json(ProjectDetail { project, steps })))
}

/// List the caller's projects, most recently updated first
pub async fn list_projects(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(state.store.list_user_projects(&user.0).await?))
}

/// Get a project with its steps
pub async fn get_project(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectDetail>, AppError> {
    let project = owned_project(&state, &user, project_id).await?;
    let steps = state.store.list_steps(project_id).await?;
    Ok(Json(ProjectDetail { project, steps }))
}

/// Rename, describe or archive a project
pub async fn update_project(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    owned_project(&state, &user, project_id).await?;

    let patch = ProjectPatch {
        title: req
            .title
            .as_deref()
            .map(|t| required(t, "Project title"))
            .transpose()?,
        description: req.description.map(|d| d.trim().to_string()),
        status: req.status,
        ..Default::default()
    };
    Ok(Json(state.store.update_project(project_id, &patch).await?))
}

/// Delete a project and its steps
pub async fn delete_project(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    owned_project(&state, &user, project_id).await?;
    state.store.delete_project(project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, StepStatus};
    use crate::test_helpers::{read_json, request, test_server};
    use axum::http::Method;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_create_project_with_steps() {
        let (app, store) = test_server();

        let resp = app
            .oneshot(request(
                Method::POST,
                "/api/projects",
                Some("user-1"),
                Some(json!({
                    "title": "  Move house ",
                    "description": "Everything in one weekend",
                    "steps": [
                        {"title": "Book van", "description": "A simple booking", "automatable": true},
                        {"title": "Pack"}
                    ]
                })),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: ProjectDetail = read_json(resp).await;
        assert_eq!(body.project.title, "Move house");
        assert_eq!(body.project.user_id, "user-1");
        assert_eq!(body.project.total_steps, 2);
        assert_eq!(body.project.current_step_index, 0);
        assert_eq!(body.steps[0].order, 0);
        assert_eq!(body.steps[1].order, 1);
        assert!(body.steps[0].automatable);
        assert_eq!(body.steps[1].status, StepStatus::Pending);

        let stored = store.list_steps(body.project.id).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_create_project_requires_titles() {
        let (app, store) = test_server();

        let resp = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/projects",
                Some("user-1"),
                Some(json!({"title": "   "})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app
            .oneshot(request(
                Method::POST,
                "/api/projects",
                Some("user-1"),
                Some(json!({"title": "ok", "steps": [{"title": "fine"}, {"title": ""}]})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = read_json(resp).await;
        assert_eq!(body["error"], "Step 2 title is required");
        assert!(store.list_user_projects("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let (app, _) = test_server();
        let resp = app
            .oneshot(request(Method::GET, "/api/projects", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_other_users_project_is_not_found() {
        let (app, store) = test_server();
        let project = crate::test_helpers::test_project("owner", 0);
        store.create_project(&project).await.unwrap();

        let uri = format!("/api/projects/{}", project.id);
        let resp = app
            .clone()
            .oneshot(request(Method::GET, &uri, Some("intruder"), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .oneshot(request(Method::DELETE, &uri, Some("intruder"), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(store.get_project(project.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_and_delete_project() {
        let (app, store) = test_server();
        let project = crate::test_helpers::test_project("user-1", 0);
        store.create_project(&project).await.unwrap();
        let uri = format!("/api/projects/{}", project.id);

        let resp = app
            .clone()
            .oneshot(request(
                Method::PATCH,
                &uri,
                Some("user-1"),
                Some(json!({"title": "Renamed", "status": "archived"})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let updated: Project = read_json(resp).await;
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.status, ProjectStatus::Archived);

        let resp = app
            .oneshot(request(Method::DELETE, &uri, Some("user-1"), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(store.get_project(project.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_only_own_projects() {
        let (app, store) = test_server();
        store
            .create_project(&crate::test_helpers::test_project("user-1", 0))
            .await
            .unwrap();
        store
            .create_project(&crate::test_helpers::test_project("user-2", 0))
            .await
            .unwrap();

        let resp = app
            .oneshot(request(Method::GET, "/api/projects", Some("user-1"), None))
            .await
            .unwrap();
        let projects: Vec<Project> = read_json(resp).await;
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].user_id, "user-1");
    }
}
