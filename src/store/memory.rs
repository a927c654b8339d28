//! In-memory implementation of DocumentStore.
//!
//! Keeps every collection in a `tokio::sync::RwLock<HashMap<K, V>>`.
//! Used by `stepwise serve --memory` and throughout the test suite.

use crate::store::models::*;
use crate::store::traits::{check_batch_size, DocumentStore, StoreError};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory document store
#[derive(Default)]
pub struct MemoryStore {
    pub projects: RwLock<HashMap<Uuid, Project>>,
    pub steps: RwLock<HashMap<Uuid, Step>>,
    pub notifications: RwLock<HashMap<Uuid, Notification>>,
    pub push_tokens: RwLock<HashMap<String, PushToken>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    // ========================================================================
    // Project operations
    // ========================================================================

    async fn create_project(&self, project: &Project) -> Result<()> {
        self.projects
            .write()
            .await
            .insert(project.id, project.clone());
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn list_user_projects(&self, user_id: &str) -> Result<Vec<Project>> {
        let projects = self.projects.read().await;
        let mut result: Vec<Project> = projects
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(result)
    }

    async fn update_project(&self, id: Uuid, patch: &ProjectPatch) -> Result<Project> {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Project {}", id)))?;
        patch.apply(project, Utc::now());
        Ok(project.clone())
    }

    async fn delete_project(&self, id: Uuid) -> Result<()> {
        self.projects.write().await.remove(&id);
        self.steps.write().await.retain(|_, s| s.project_id != id);
        Ok(())
    }

    // ========================================================================
    // Step operations
    // ========================================================================

    async fn create_step(&self, step: &Step) -> Result<()> {
        let mut steps = self.steps.write().await;
        if steps
            .values()
            .any(|s| s.project_id == step.project_id && s.order == step.order)
        {
            return Err(StoreError::Conflict(format!(
                "Project {} already has a step with order {}",
                step.project_id, step.order
            ))
            .into());
        }
        steps.insert(step.id, step.clone());
        Ok(())
    }

    async fn get_step(&self, project_id: Uuid, step_id: Uuid) -> Result<Option<Step>> {
        Ok(self
            .steps
            .read()
            .await
            .get(&step_id)
            .filter(|s| s.project_id == project_id)
            .cloned())
    }

    async fn list_steps(&self, project_id: Uuid) -> Result<Vec<Step>> {
        let steps = self.steps.read().await;
        let mut result: Vec<Step> = steps
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        result.sort_by_key(|s| s.order);
        Ok(result)
    }

    async fn update_step(
        &self,
        project_id: Uuid,
        step_id: Uuid,
        patch: &StepPatch,
    ) -> Result<Step> {
        let mut steps = self.steps.write().await;
        let step = steps
            .get_mut(&step_id)
            .filter(|s| s.project_id == project_id)
            .ok_or_else(|| StoreError::NotFound(format!("Step {}", step_id)))?;
        patch.apply(step, Utc::now());
        Ok(step.clone())
    }

    // ========================================================================
    // Notification operations
    // ========================================================================

    async fn create_notification(&self, notification: &Notification) -> Result<()> {
        self.notifications
            .write()
            .await
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_user_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mut result: Vec<Notification> = notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<bool> {
        match self.notifications.write().await.get_mut(&id) {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ========================================================================
    // Push token operations
    // ========================================================================

    async fn upsert_push_token(&self, token: &PushToken) -> Result<()> {
        self.push_tokens
            .write()
            .await
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn list_user_push_tokens(&self, user_id: &str) -> Result<Vec<PushToken>> {
        let tokens = self.push_tokens.read().await;
        let mut result: Vec<PushToken> = tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.token.cmp(&b.token));
        Ok(result)
    }

    async fn delete_push_token(&self, token: &str) -> Result<()> {
        self.push_tokens.write().await.remove(token);
        Ok(())
    }

    async fn list_stale_push_tokens(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>> {
        let tokens = self.push_tokens.read().await;
        let mut stale: Vec<String> = tokens
            .values()
            .filter(|t| t.updated_at < cutoff)
            .map(|t| t.token.clone())
            .collect();
        stale.sort();
        Ok(stale)
    }

    async fn count_push_tokens(&self) -> Result<usize> {
        Ok(self.push_tokens.read().await.len())
    }

    async fn delete_push_tokens(&self, tokens: &[String]) -> Result<usize> {
        check_batch_size(tokens)?;
        // Single write guard: the batch is applied atomically
        let mut stored = self.push_tokens.write().await;
        let deleted = tokens
            .iter()
            .filter(|t| stored.remove(t.as_str()).is_some())
            .count();
        Ok(deleted)
    }

    // ========================================================================
    // Health
    // ========================================================================

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{test_project, test_push_token, test_step};
    use chrono::Duration;

    #[tokio::test]
    async fn test_list_steps_sorted_by_order() {
        let store = MemoryStore::new();
        let project = test_project("user-1", 3);
        store.create_project(&project).await.unwrap();
        for order in [2, 0, 1] {
            store
                .create_step(&test_step(project.id, order, "manual work", false))
                .await
                .unwrap();
        }

        let steps = store.list_steps(project.id).await.unwrap();
        let orders: Vec<u32> = steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_duplicate_step_order_rejected() {
        let store = MemoryStore::new();
        let project = test_project("user-1", 2);
        store
            .create_step(&test_step(project.id, 0, "first", false))
            .await
            .unwrap();

        let err = store
            .create_step(&test_step(project.id, 0, "again", false))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::Conflict(_))
        ));

        // Same order in another project is fine
        let other = test_project("user-1", 1);
        store
            .create_step(&test_step(other.id, 0, "first", false))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_step_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_step(Uuid::new_v4(), Uuid::new_v4(), &StepPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_step_checks_project() {
        let store = MemoryStore::new();
        let project = test_project("user-1", 1);
        let step = test_step(project.id, 0, "first", false);
        store.create_step(&step).await.unwrap();

        assert!(store.get_step(project.id, step.id).await.unwrap().is_some());
        assert!(store
            .get_step(Uuid::new_v4(), step.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_project_removes_steps() {
        let store = MemoryStore::new();
        let project = test_project("user-1", 2);
        store.create_project(&project).await.unwrap();
        store
            .create_step(&test_step(project.id, 0, "a", false))
            .await
            .unwrap();
        store
            .create_step(&test_step(project.id, 1, "b", false))
            .await
            .unwrap();

        store.delete_project(project.id).await.unwrap();
        assert!(store.get_project(project.id).await.unwrap().is_none());
        assert!(store.list_steps(project.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_tokens_strictly_older_than_cutoff() {
        let store = MemoryStore::new();
        let cutoff = Utc::now() - Duration::days(30);
        store
            .upsert_push_token(&test_push_token("old", "u", cutoff - Duration::seconds(1)))
            .await
            .unwrap();
        store
            .upsert_push_token(&test_push_token("edge", "u", cutoff))
            .await
            .unwrap();
        store
            .upsert_push_token(&test_push_token("fresh", "u", Utc::now()))
            .await
            .unwrap();

        let stale = store.list_stale_push_tokens(cutoff).await.unwrap();
        assert_eq!(stale, vec!["old".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_push_tokens_rejects_oversized_batch() {
        let store = MemoryStore::new();
        let tokens: Vec<String> = (0..501).map(|i| format!("t{}", i)).collect();
        assert!(store.delete_push_tokens(&tokens).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_refreshes_token() {
        let store = MemoryStore::new();
        let old = Utc::now() - Duration::days(40);
        store
            .upsert_push_token(&test_push_token("tok", "u", old))
            .await
            .unwrap();
        store
            .upsert_push_token(&test_push_token("tok", "u", Utc::now()))
            .await
            .unwrap();

        assert_eq!(store.count_push_tokens().await.unwrap(), 1);
        assert!(store
            .list_stale_push_tokens(Utc::now() - Duration::days(30))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_mark_notification_read() {
        let store = MemoryStore::new();
        assert!(!store.mark_notification_read(Uuid::new_v4()).await.unwrap());
    }
}
