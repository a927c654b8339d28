//! Step document triggers

use super::TriggerRouter;
use crate::events::Document;
use crate::store::{Project, Step, StepStatus};
use anyhow::Result;
use tracing::{debug, error};
use uuid::Uuid;

/// `projects/{projectId}/steps/{stepId}` created.
///
/// The first step of a project is automated right away when it can be.
pub async fn on_step_create(
    router: &TriggerRouter,
    project_id: Uuid,
    step_id: Uuid,
    data: Option<&Document>,
) -> Result<()> {
    let Some(step) = data.and_then(Document::as_step) else {
        error!(project_id = %project_id, step_id = %step_id, "No step data in create event");
        return Ok(());
    };
    let Some(project) = load_project(router, project_id).await? else {
        return Ok(());
    };

    if step.order == 0 && step.awaits_automation() {
        run_automation(router, &project, step).await;
    }
    Ok(())
}

/// `projects/{projectId}/steps/{stepId}` updated.
pub async fn on_step_update(
    router: &TriggerRouter,
    project_id: Uuid,
    step_id: Uuid,
    before: Option<&Document>,
    after: Option<&Document>,
) -> Result<()> {
    let (Some(before), Some(after)) = (
        before.and_then(Document::as_step),
        after.and_then(Document::as_step),
    ) else {
        error!(project_id = %project_id, step_id = %step_id, "Missing document data in update event");
        return Ok(());
    };
    let Some(project) = load_project(router, project_id).await? else {
        return Ok(());
    };

    if after.awaits_automation()
        && matches!(after.status, StepStatus::Pending | StepStatus::InProgress)
    {
        run_automation(router, &project, after).await;
    }

    let was_completed = before.status == StepStatus::Completed;
    let is_completed = after.status == StepStatus::Completed;
    if !was_completed && is_completed {
        router
            .progress()
            .handle_step_completion(&project, after)
            .await?;
    } else if was_completed && !is_completed {
        debug!(project_id = %project_id, step_id = %step_id, "Step reopened, recounting progress");
        router.progress().recompute(&project).await?;
    }
    Ok(())
}

async fn load_project(router: &TriggerRouter, project_id: Uuid) -> Result<Option<Project>> {
    let project = router.store().get_project(project_id).await?;
    if project.is_none() {
        error!(project_id = %project_id, "Project not found");
    }
    Ok(project)
}

async fn run_automation(router: &TriggerRouter, project: &Project, step: &Step) {
    if let Err(e) = router.automation().attempt(project, step).await {
        error!(project_id = %project.id, step_id = %step.id, "Automation error: {:#}", e);
    }
}
