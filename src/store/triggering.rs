//! Store decorator that fires document events after writes.
//!
//! Project and step writes going through a `TriggeringStore` emit a
//! `DocumentEvent` once the inner store has accepted them, which is what
//! drives the trigger handlers. Updates carry the before and after snapshots.
//! Notification and push-token writes pass through silently.

use crate::events::{DocumentPath, EventEmitter};
use crate::store::models::*;
use crate::store::traits::DocumentStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct TriggeringStore {
    inner: Arc<dyn DocumentStore>,
    emitter: Arc<dyn EventEmitter>,
}

impl TriggeringStore {
    pub fn new(inner: Arc<dyn DocumentStore>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self { inner, emitter }
    }
}

#[async_trait]
impl DocumentStore for TriggeringStore {
    // ========================================================================
    // Project operations
    // ========================================================================

    async fn create_project(&self, project: &Project) -> Result<()> {
        self.inner.create_project(project).await?;
        self.emitter.emit_project_created(project);
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        self.inner.get_project(id).await
    }

    async fn list_user_projects(&self, user_id: &str) -> Result<Vec<Project>> {
        self.inner.list_user_projects(user_id).await
    }

    async fn update_project(&self, id: Uuid, patch: &ProjectPatch) -> Result<Project> {
        let before = self.inner.get_project(id).await?;
        let after = self.inner.update_project(id, patch).await?;
        self.emitter.emit_project_updated(before, &after);
        Ok(after)
    }

    async fn delete_project(&self, id: Uuid) -> Result<()> {
        self.inner.delete_project(id).await?;
        self.emitter.emit_deleted(DocumentPath::project(id));
        Ok(())
    }

    // ========================================================================
    // Step operations
    // ========================================================================

    async fn create_step(&self, step: &Step) -> Result<()> {
        self.inner.create_step(step).await?;
        self.emitter.emit_step_created(step);
        Ok(())
    }

    async fn get_step(&self, project_id: Uuid, step_id: Uuid) -> Result<Option<Step>> {
        self.inner.get_step(project_id, step_id).await
    }

    async fn list_steps(&self, project_id: Uuid) -> Result<Vec<Step>> {
        self.inner.list_steps(project_id).await
    }

    async fn update_step(&self, project_id: Uuid, step_id: Uuid, patch: &StepPatch) -> Result<Step> {
        let before = self.inner.get_step(project_id, step_id).await?;
        let after = self.inner.update_step(project_id, step_id, patch).await?;
        self.emitter.emit_step_updated(before, &after);
        Ok(after)
    }

    // ========================================================================
    // Pass-through
    // ========================================================================

    async fn create_notification(&self, notification: &Notification) -> Result<()> {
        self.inner.create_notification(notification).await
    }

    async fn list_user_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.inner.list_user_notifications(user_id).await
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
        self.inner.mark_notification_read(id).await
    }

    async fn upsert_push_token(&self, token: &PushToken) -> Result<()> {
        self.inner.upsert_push_token(token).await
    }

    async fn list_user_push_tokens(&self, user_id: &str) -> Result<Vec<PushToken>> {
        self.inner.list_user_push_tokens(user_id).await
    }

    async fn delete_push_token(&self, token: &str) -> Result<()> {
        self.inner.delete_push_token(token).await
    }

    async fn list_stale_push_tokens(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        self.inner.list_stale_push_tokens(cutoff).await
    }

    async fn count_push_tokens(&self) -> Result<usize> {
        self.inner.count_push_tokens().await
    }

    async fn delete_push_tokens(&self, tokens: &[String]) -> Result<usize> {
        self.inner.delete_push_tokens(tokens).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Document, DocumentEvent, EventBus};
    use crate::store::MemoryStore;
    use crate::test_helpers::{test_project, test_push_token, test_step};

    fn setup() -> (TriggeringStore, Arc<EventBus>) {
        let bus = Arc::new(EventBus::default());
        let store = TriggeringStore::new(Arc::new(MemoryStore::default()), bus.clone());
        (store, bus)
    }

    #[tokio::test]
    async fn test_create_project_emits_created() {
        let (store, bus) = setup();
        let mut rx = bus.subscribe();

        let project = test_project("user-1", 1);
        store.create_project(&project).await.unwrap();

        match rx.try_recv().unwrap() {
            DocumentEvent::Created { path, data } => {
                assert_eq!(path, DocumentPath::project(project.id));
                assert_eq!(data, Some(Document::Project(project)));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_step_emits_before_and_after() {
        let (store, bus) = setup();
        let project = test_project("user-1", 1);
        store.create_project(&project).await.unwrap();
        let step = test_step(project.id, 0, "Do it by hand", false);
        store.create_step(&step).await.unwrap();

        let mut rx = bus.subscribe();
        store
            .update_step(project.id, step.id, &StepPatch::status(StepStatus::Completed))
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            DocumentEvent::Updated { path, before, after } => {
                assert_eq!(path, DocumentPath::step(project.id, step.id));
                let before = before.unwrap();
                let after = after.unwrap();
                assert_eq!(before.as_step().unwrap().status, StepStatus::Pending);
                assert_eq!(after.as_step().unwrap().status, StepStatus::Completed);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_write_emits_nothing() {
        let (store, bus) = setup();
        let project = test_project("user-1", 2);
        store.create_project(&project).await.unwrap();
        store
            .create_step(&test_step(project.id, 0, "first", false))
            .await
            .unwrap();

        let mut rx = bus.subscribe();
        let duplicate = test_step(project.id, 0, "also first", false);
        assert!(store.create_step(&duplicate).await.is_err());
        assert!(store
            .update_project(Uuid::new_v4(), &ProjectPatch::default())
            .await
            .is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_token_writes_are_silent() {
        let (store, bus) = setup();
        let mut rx = bus.subscribe();

        store
            .upsert_push_token(&test_push_token("tok-1", "user-1", Utc::now()))
            .await
            .unwrap();
        store.delete_push_token("tok-1").await.unwrap();

        assert!(rx.try_recv().is_err());
        assert_eq!(store.count_push_tokens().await.unwrap(), 0);
    }
}
