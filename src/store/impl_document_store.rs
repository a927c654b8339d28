//! `DocumentStore` implementation for `Neo4jStore`.
//!
//! Every method simply delegates to the corresponding inherent method on `Neo4jStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::client::Neo4jStore;
use super::models::*;
use super::traits::DocumentStore;

#[async_trait]
impl DocumentStore for Neo4jStore {
    // ========================================================================
    // Project operations
    // ========================================================================

    async fn create_project(&self, project: &Project) -> anyhow::Result<()> {
        self.create_project(project).await
    }

    async fn get_project(&self, id: Uuid) -> anyhow::Result<Option<Project>> {
        self.get_project(id).await
    }

    async fn list_user_projects(&self, user_id: &str) -> anyhow::Result<Vec<Project>> {
        self.list_user_projects(user_id).await
    }

    async fn update_project(&self, id: Uuid, patch: &ProjectPatch) -> anyhow::Result<Project> {
        self.update_project(id, patch).await
    }

    async fn delete_project(&self, id: Uuid) -> anyhow::Result<()> {
        self.delete_project(id).await
    }

    // ========================================================================
    // Step operations
    // ========================================================================

    async fn create_step(&self, step: &Step) -> anyhow::Result<()> {
        self.create_step(step).await
    }

    async fn get_step(&self, project_id: Uuid, step_id: Uuid) -> anyhow::Result<Option<Step>> {
        self.get_step(project_id, step_id).await
    }

    async fn list_steps(&self, project_id: Uuid) -> anyhow::Result<Vec<Step>> {
        self.list_steps(project_id).await
    }

    async fn update_step(
        &self,
        project_id: Uuid,
        step_id: Uuid,
        patch: &StepPatch,
    ) -> anyhow::Result<Step> {
        self.update_step(project_id, step_id, patch).await
    }

    // ========================================================================
    // Notification operations
    // ========================================================================

    async fn create_notification(&self, notification: &Notification) -> anyhow::Result<()> {
        self.create_notification(notification).await
    }

    async fn list_user_notifications(&self, user_id: &str) -> anyhow::Result<Vec<Notification>> {
        self.list_user_notifications(user_id).await
    }

    async fn mark_notification_read(&self, id: Uuid) -> anyhow::Result<bool> {
        self.mark_notification_read(id).await
    }

    // ========================================================================
    // Push token operations
    // ========================================================================

    async fn upsert_push_token(&self, token: &PushToken) -> anyhow::Result<()> {
        self.upsert_push_token(token).await
    }

    async fn list_user_push_tokens(&self, user_id: &str) -> anyhow::Result<Vec<PushToken>> {
        self.list_user_push_tokens(user_id).await
    }

    async fn delete_push_token(&self, token: &str) -> anyhow::Result<()> {
        self.delete_push_token(token).await
    }

    async fn list_stale_push_tokens(&self, cutoff: DateTime<Utc>) -> anyhow::Result<Vec<String>> {
        self.list_stale_push_tokens(cutoff).await
    }

    async fn count_push_tokens(&self) -> anyhow::Result<usize> {
        self.count_push_tokens().await
    }

    async fn delete_push_tokens(&self, tokens: &[String]) -> anyhow::Result<usize> {
        self.delete_push_tokens(tokens).await
    }

    // ========================================================================
    // Health
    // ========================================================================

    async fn health_check(&self) -> anyhow::Result<bool> {
        self.health_check().await
    }
}
