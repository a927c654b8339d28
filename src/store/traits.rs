//! DocumentStore trait definition
//!
//! Defines the abstract interface for every datastore operation used by the
//! triggers and the HTTP API. Implemented by `Neo4jStore` (production),
//! `MemoryStore` (local runs and tests) and the `TriggeringStore` decorator.

use crate::store::models::*;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Maximum number of deletes committed atomically in one batch
pub const MAX_BATCH_SIZE: usize = 500;

/// Typed store failures callers may want to branch on.
///
/// Returned inside `anyhow::Error`; use `downcast_ref::<StoreError>()`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Abstract interface for all document store operations.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ========================================================================
    // Project operations
    // ========================================================================

    /// Create a new project
    async fn create_project(&self, project: &Project) -> Result<()>;

    /// Get a project by ID
    async fn get_project(&self, id: Uuid) -> Result<Option<Project>>;

    /// List a user's projects, most recently updated first
    async fn list_user_projects(&self, user_id: &str) -> Result<Vec<Project>>;

    /// Apply a partial update to a project. Fails with `StoreError::NotFound`
    /// if the project does not exist.
    async fn update_project(&self, id: Uuid, patch: &ProjectPatch) -> Result<Project>;

    /// Delete a project and all its steps
    async fn delete_project(&self, id: Uuid) -> Result<()>;

    // ========================================================================
    // Step operations
    // ========================================================================

    /// Create a step. Fails with `StoreError::Conflict` if another step of
    /// the same project already uses that order.
    async fn create_step(&self, step: &Step) -> Result<()>;

    /// Get a step of a project
    async fn get_step(&self, project_id: Uuid, step_id: Uuid) -> Result<Option<Step>>;

    /// List a project's steps ordered by `order` ascending
    async fn list_steps(&self, project_id: Uuid) -> Result<Vec<Step>>;

    /// Apply a partial update to a step. Fails with `StoreError::NotFound`
    /// if the step does not exist.
    async fn update_step(&self, project_id: Uuid, step_id: Uuid, patch: &StepPatch)
        -> Result<Step>;

    // ========================================================================
    // Notification operations
    // ========================================================================

    /// Store a notification record
    async fn create_notification(&self, notification: &Notification) -> Result<()>;

    /// List a user's notifications, newest first
    async fn list_user_notifications(&self, user_id: &str) -> Result<Vec<Notification>>;

    /// Mark a notification read. Returns false if it does not exist.
    async fn mark_notification_read(&self, id: Uuid) -> Result<bool>;

    // ========================================================================
    // Push token operations
    // ========================================================================

    /// Insert or refresh a push token
    async fn upsert_push_token(&self, token: &PushToken) -> Result<()>;

    /// List the push tokens registered by a user
    async fn list_user_push_tokens(&self, user_id: &str) -> Result<Vec<PushToken>>;

    /// Delete one push token (no-op if absent)
    async fn delete_push_token(&self, token: &str) -> Result<()>;

    /// Tokens whose `updated_at` is strictly older than `cutoff`
    async fn list_stale_push_tokens(&self, cutoff: DateTime<Utc>) -> Result<Vec<String>>;

    /// Total number of stored push tokens
    async fn count_push_tokens(&self) -> Result<usize>;

    /// Delete a batch of tokens in one atomic commit.
    /// Batches larger than `MAX_BATCH_SIZE` are rejected.
    async fn delete_push_tokens(&self, tokens: &[String]) -> Result<usize>;

    // ========================================================================
    // Health
    // ========================================================================

    /// Check the backend is reachable
    async fn health_check(&self) -> Result<bool>;
}

/// Shared guard for `delete_push_tokens` implementations
pub(crate) fn check_batch_size(tokens: &[String]) -> Result<()> {
    if tokens.len() > MAX_BATCH_SIZE {
        anyhow::bail!(
            "Batch of {} deletes exceeds the limit of {}",
            tokens.len(),
            MAX_BATCH_SIZE
        );
    }
    Ok(())
}
