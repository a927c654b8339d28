//! Push messenger that only logs.
//!
//! Stands in for FCM when no credentials are configured so that local runs
//! still go through the whole notification path.

use super::traits::PushMessenger;
use super::types::{BatchResponse, MulticastMessage, PushError, SendResponse};
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct LogMessenger;

#[async_trait]
impl PushMessenger for LogMessenger {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, PushError> {
        info!(
            tokens = message.tokens.len(),
            title = %message.title,
            body = %message.body,
            data = ?message.data,
            "Push delivery not configured, logging message"
        );
        Ok(BatchResponse {
            responses: message
                .tokens
                .iter()
                .map(|t| SendResponse::success(t.clone(), format!("log/{}", Uuid::new_v4())))
                .collect(),
        })
    }
}
