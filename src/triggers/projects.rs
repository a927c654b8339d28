//! Project document triggers

use super::TriggerRouter;
use crate::events::Document;
use crate::notifications::NotificationRequest;
use crate::store::NotificationKind;
use anyhow::Result;
use tracing::{error, info};
use uuid::Uuid;

/// `projects/{projectId}` created: greet the owner
pub async fn on_project_create(
    router: &TriggerRouter,
    project_id: Uuid,
    data: Option<&Document>,
) -> Result<()> {
    let Some(project) = data.and_then(Document::as_project) else {
        error!(project_id = %project_id, "No project data in create event");
        return Ok(());
    };

    router
        .notifications()
        .send(NotificationRequest {
            user_id: project.user_id.clone(),
            project_id,
            step_id: None,
            title: "Project Created!".to_string(),
            body: format!("\"{}\" is ready to go.", project.title),
            kind: NotificationKind::ProjectCreated,
        })
        .await?;

    info!(project_id = %project_id, user_id = %project.user_id, "Project creation notified");
    Ok(())
}
