//! Project progress bookkeeping after step status changes

use crate::automation::AutomationRunner;
use crate::notifications::{NotificationDispatcher, NotificationRequest};
use crate::store::{
    DocumentStore, NotificationKind, Project, ProjectPatch, ProjectStatus, Step, StepStatus,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn DocumentStore>,
    notifications: NotificationDispatcher,
    automation: AutomationRunner,
}

/// Counts derived from a project's steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Progress {
    completed: u32,
    all_completed: bool,
}

impl Progress {
    fn of(steps: &[Step]) -> Self {
        let completed = steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        Self {
            completed: completed as u32,
            all_completed: !steps.is_empty() && completed == steps.len(),
        }
    }

    fn patch(&self) -> ProjectPatch {
        ProjectPatch {
            current_step_index: Some(self.completed),
            status: Some(if self.all_completed {
                ProjectStatus::Completed
            } else {
                ProjectStatus::Active
            }),
            ..Default::default()
        }
    }
}

impl ProgressTracker {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifications: NotificationDispatcher,
        automation: AutomationRunner,
    ) -> Self {
        Self {
            store,
            notifications,
            automation,
        }
    }

    /// React to `step` having just become completed.
    ///
    /// Updates the project's progress, tells the owner what comes next and
    /// kicks off automation on the following step when it is automatable.
    pub async fn handle_step_completion(&self, project: &Project, step: &Step) -> Result<()> {
        let steps = self.store.list_steps(project.id).await?;
        let progress = Progress::of(&steps);

        self.store.update_project(project.id, &progress.patch()).await?;
        info!(
            project_id = %project.id,
            completed = progress.completed,
            total = steps.len(),
            "Project progress updated"
        );

        let Some(position) = steps.iter().position(|s| s.id == step.id) else {
            warn!(project_id = %project.id, step_id = %step.id, "Completed step not found among project steps");
            return Ok(());
        };

        match steps.get(position + 1) {
            Some(next) => {
                self.notifications
                    .send(NotificationRequest {
                        user_id: project.user_id.clone(),
                        project_id: project.id,
                        step_id: Some(step.id),
                        title: "Step Completed!".to_string(),
                        body: format!("\"{}\" is complete. Next: \"{}\"", step.title, next.title),
                        kind: NotificationKind::StepCompleted,
                    })
                    .await?;

                if next.awaits_automation() {
                    self.automation.attempt(project, next).await?;
                }
            }
            None => {
                self.notifications
                    .send(NotificationRequest {
                        user_id: project.user_id.clone(),
                        project_id: project.id,
                        step_id: Some(step.id),
                        title: "Project Completed!".to_string(),
                        body: "All steps have been completed successfully.".to_string(),
                        kind: NotificationKind::StepCompleted,
                    })
                    .await?;
            }
        }
        Ok(())
    }

    /// Recount completed steps without notifying anyone.
    ///
    /// Used when a step leaves the completed state.
    pub async fn recompute(&self, project: &Project) -> Result<Project> {
        let steps = self.store.list_steps(project.id).await?;
        let progress = Progress::of(&steps);
        self.store.update_project(project.id, &progress.patch()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::SUCCESS_RESULT;
    use crate::push::RecordingMessenger;
    use crate::store::{MemoryStore, StepPatch};
    use crate::test_helpers::{test_project, test_step};

    struct Fixture {
        store: Arc<MemoryStore>,
        tracker: ProgressTracker,
        project: Project,
        steps: Vec<Step>,
    }

    /// Project owned by `user-1` with steps built from (description, automatable)
    async fn fixture(specs: &[(&str, bool)]) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let notifications =
            NotificationDispatcher::new(store.clone(), Arc::new(RecordingMessenger::new()));
        let automation = AutomationRunner::new(store.clone(), notifications.clone());
        let tracker = ProgressTracker::new(store.clone(), notifications, automation);

        let project = test_project("user-1", specs.len() as u32);
        store.create_project(&project).await.unwrap();
        let mut steps = Vec::new();
        for (order, (description, automatable)) in specs.iter().enumerate() {
            let step = test_step(project.id, order as u32, description, *automatable);
            store.create_step(&step).await.unwrap();
            steps.push(step);
        }
        Fixture {
            store,
            tracker,
            project,
            steps,
        }
    }

    async fn complete(f: &Fixture, index: usize) -> Step {
        f.store
            .update_step(
                f.project.id,
                f.steps[index].id,
                &StepPatch::status(StepStatus::Completed),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_middle_step_completion_notifies_next() {
        let f = fixture(&[("first", false), ("second", false), ("third", false)]).await;
        let done = complete(&f, 0).await;

        f.tracker
            .handle_step_completion(&f.project, &done)
            .await
            .unwrap();

        let project = f.store.get_project(f.project.id).await.unwrap().unwrap();
        assert_eq!(project.current_step_index, 1);
        assert_eq!(project.status, ProjectStatus::Active);

        let notes = f.store.list_user_notifications("user-1").await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Step Completed!");
        assert_eq!(
            notes[0].body,
            format!("\"{}\" is complete. Next: \"{}\"", done.title, f.steps[1].title)
        );
        assert_eq!(notes[0].kind, NotificationKind::StepCompleted);
    }

    #[tokio::test]
    async fn test_last_step_completes_project() {
        let f = fixture(&[("first", false), ("second", false)]).await;
        complete(&f, 0).await;
        let last = complete(&f, 1).await;

        f.tracker
            .handle_step_completion(&f.project, &last)
            .await
            .unwrap();

        let project = f.store.get_project(f.project.id).await.unwrap().unwrap();
        assert_eq!(project.current_step_index, 2);
        assert_eq!(project.status, ProjectStatus::Completed);

        let notes = f.store.list_user_notifications("user-1").await.unwrap();
        assert_eq!(notes[0].title, "Project Completed!");
        assert_eq!(notes[0].body, "All steps have been completed successfully.");
        assert_eq!(notes[0].kind, NotificationKind::StepCompleted);
    }

    #[tokio::test]
    async fn test_last_step_with_earlier_pending_stays_active() {
        let f = fixture(&[("first", false), ("second", false)]).await;
        let last = complete(&f, 1).await;

        f.tracker
            .handle_step_completion(&f.project, &last)
            .await
            .unwrap();

        let project = f.store.get_project(f.project.id).await.unwrap().unwrap();
        assert_eq!(project.current_step_index, 1);
        assert_eq!(project.status, ProjectStatus::Active);
        let notes = f.store.list_user_notifications("user-1").await.unwrap();
        assert_eq!(notes[0].title, "Project Completed!");
    }

    #[tokio::test]
    async fn test_automatable_next_step_is_attempted() {
        let f = fixture(&[("manual", false), ("a simple follow-up", true)]).await;
        let done = complete(&f, 0).await;

        f.tracker
            .handle_step_completion(&f.project, &done)
            .await
            .unwrap();

        let next = f
            .store
            .get_step(f.project.id, f.steps[1].id)
            .await
            .unwrap()
            .unwrap();
        assert!(next.automation_attempted);
        assert_eq!(next.status, StepStatus::Completed);
        assert_eq!(next.automation_result.as_deref(), Some(SUCCESS_RESULT));
    }

    #[tokio::test]
    async fn test_already_attempted_next_step_is_left_alone() {
        let f = fixture(&[("manual", false), ("simple", true)]).await;
        f.store
            .update_step(
                f.project.id,
                f.steps[1].id,
                &StepPatch {
                    automation_attempted: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let done = complete(&f, 0).await;

        f.tracker
            .handle_step_completion(&f.project, &done)
            .await
            .unwrap();

        let next = f
            .store
            .get_step(f.project.id, f.steps[1].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.status, StepStatus::Pending);
    }

    #[tokio::test]
    async fn test_recompute_after_reset() {
        let f = fixture(&[("first", false), ("second", false)]).await;
        complete(&f, 0).await;
        complete(&f, 1).await;
        f.tracker.recompute(&f.project).await.unwrap();

        f.store
            .update_step(
                f.project.id,
                f.steps[1].id,
                &StepPatch::status(StepStatus::Pending),
            )
            .await
            .unwrap();
        let project = f.tracker.recompute(&f.project).await.unwrap();

        assert_eq!(project.current_step_index, 1);
        assert_eq!(project.status, ProjectStatus::Active);
        assert!(f
            .store
            .list_user_notifications("user-1")
            .await
            .unwrap()
            .is_empty());
    }
}
