//! Keyword-based step automation.
//!
//! A step is "automated" when its description mentions the word `simple`.
//! This is a placeholder for real automation.

use crate::notifications::{NotificationDispatcher, NotificationRequest};
use crate::store::{DocumentStore, NotificationKind, Project, Step, StepPatch, StepStatus};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

const AUTOMATION_KEYWORD: &str = "simple";
pub const SUCCESS_RESULT: &str = "Task was automatically completed successfully.";
pub const MANUAL_RESULT: &str = "This task requires manual intervention.";

/// Result of an automation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationOutcome {
    pub success: bool,
    pub result: String,
}

/// Decide whether a step with this description can be completed automatically
pub fn evaluate(description: Option<&str>) -> AutomationOutcome {
    let success = description
        .map(|d| d.to_lowercase().contains(AUTOMATION_KEYWORD))
        .unwrap_or(false);
    AutomationOutcome {
        success,
        result: if success { SUCCESS_RESULT } else { MANUAL_RESULT }.to_string(),
    }
}

/// Runs automation against stored steps
#[derive(Clone)]
pub struct AutomationRunner {
    store: Arc<dyn DocumentStore>,
    notifications: NotificationDispatcher,
}

impl AutomationRunner {
    pub fn new(store: Arc<dyn DocumentStore>, notifications: NotificationDispatcher) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Attempt automation on `step`.
    ///
    /// The step is marked attempted before evaluating so it is never tried
    /// twice. On success it is completed; otherwise it moves to
    /// `in_progress` and the project owner is asked to act.
    pub async fn attempt(&self, project: &Project, step: &Step) -> Result<AutomationOutcome> {
        self.store
            .update_step(
                step.project_id,
                step.id,
                &StepPatch {
                    automation_attempted: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let description = Some(step.description.as_str()).filter(|d| !d.is_empty());
        let outcome = evaluate(description);

        if outcome.success {
            self.store
                .update_step(
                    step.project_id,
                    step.id,
                    &StepPatch {
                        status: Some(StepStatus::Completed),
                        automation_result: Some(outcome.result.clone()),
                        ..Default::default()
                    },
                )
                .await?;
            info!(project_id = %project.id, step_id = %step.id, "Step automated successfully");
        } else {
            self.store
                .update_step(
                    step.project_id,
                    step.id,
                    &StepPatch {
                        status: Some(StepStatus::InProgress),
                        automation_result: Some(outcome.result.clone()),
                        ..Default::default()
                    },
                )
                .await?;

            self.notifications
                .send(NotificationRequest {
                    user_id: project.user_id.clone(),
                    project_id: project.id,
                    step_id: Some(step.id),
                    title: "Manual Action Required".to_string(),
                    body: format!(
                        "Step \"{}\" could not be automated. {}",
                        step.title, outcome.result
                    ),
                    kind: NotificationKind::ManualActionRequired,
                })
                .await?;
            info!(project_id = %project.id, step_id = %step.id, "Step needs manual action");
        }

        Ok(outcome)
    }
}
