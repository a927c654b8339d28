//! Notification fan-out: one stored record plus a push multicast.

use crate::push::{MulticastMessage, PushMessenger, MAX_MULTICAST_TOKENS};
use crate::store::{DocumentStore, Notification, NotificationKind};
use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What to tell a user about one of their projects
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub user_id: String,
    pub project_id: Uuid,
    /// None for project-level notices
    pub step_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
}

impl NotificationRequest {
    fn into_record(self) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            project_id: self.project_id,
            step_id: self.step_id,
            title: self.title,
            body: self.body,
            kind: self.kind,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// Writes notification records and pushes them to the recipient's devices
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn DocumentStore>,
    messenger: Arc<dyn PushMessenger>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn DocumentStore>, messenger: Arc<dyn PushMessenger>) -> Self {
        Self { store, messenger }
    }

    /// Record the notification, then push it.
    ///
    /// Only a failure to write the record is returned. Push problems are
    /// logged, and tokens the push provider reports as dead are deleted.
    pub async fn send(&self, request: NotificationRequest) -> Result<Notification> {
        let record = request.into_record();
        self.store
            .create_notification(&record)
            .await
            .context("Failed to write notification record")?;

        if let Err(e) = self.push(&record).await {
            error!(
                user_id = %record.user_id,
                project_id = %record.project_id,
                "Error sending push notification: {:#}",
                e
            );
        }
        Ok(record)
    }

    async fn push(&self, record: &Notification) -> Result<()> {
        let tokens: Vec<String> = self
            .store
            .list_user_push_tokens(&record.user_id)
            .await?
            .into_iter()
            .map(|t| t.token)
            .collect();

        if tokens.is_empty() {
            info!(user_id = %record.user_id, "No FCM tokens found for user");
            return Ok(());
        }

        let mut data = BTreeMap::new();
        data.insert("projectId".to_string(), record.project_id.to_string());
        data.insert(
            "stepId".to_string(),
            record.step_id.map(|id| id.to_string()).unwrap_or_default(),
        );
        data.insert("type".to_string(), record.kind.as_str().to_string());

        for chunk in tokens.chunks(MAX_MULTICAST_TOKENS) {
            let message = MulticastMessage {
                tokens: chunk.to_vec(),
                title: record.title.clone(),
                body: record.body.clone(),
                data: data.clone(),
            };
            let batch = self.messenger.send_multicast(&message).await?;
            debug!(
                user_id = %record.user_id,
                success = batch.success_count(),
                failure = batch.failure_count(),
                "Push multicast delivered"
            );

            for response in batch.responses.iter().filter(|r| !r.is_success()) {
                if let Some(failure) = &response.error {
                    warn!(code = %failure.code, "Push to a device failed: {}", failure.message);
                }
            }

            for token in batch.stale_tokens() {
                if let Err(e) = self.store.delete_push_token(&token).await {
                    warn!(user_id = %record.user_id, "Failed to delete invalid token: {:#}", e);
                } else {
                    info!(user_id = %record.user_id, "Deleted invalid push token");
                }
            }
        }
        Ok(())
    }
}
