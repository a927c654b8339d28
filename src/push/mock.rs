//! Recording push messenger for tests.
//!
//! Keeps every multicast it receives and answers with scripted per-token
//! failures, or fails whole calls when told to.

use super::traits::PushMessenger;
use super::types::{BatchResponse, MulticastMessage, PushError, PushErrorCode, SendResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<MulticastMessage>>,
    failures: Mutex<HashMap<String, PushErrorCode>>,
    reject_all: Mutex<bool>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future send to `token` fail with `code`
    pub fn fail_token(&self, token: impl Into<String>, code: PushErrorCode) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.into(), code);
    }

    /// Make every future call fail as a whole
    pub fn reject_all(&self) {
        *self.reject_all.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    /// Messages received so far, in order
    pub fn sent(&self) -> Vec<MulticastMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PushMessenger for RecordingMessenger {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, PushError> {
        if *self.reject_all.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(PushError::Unauthorized { status: 401 });
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.clone());

        let failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        let responses = message
            .tokens
            .iter()
            .enumerate()
            .map(|(i, token)| match failures.get(token) {
                Some(code) => SendResponse::failure(token.clone(), code.clone(), "scripted failure"),
                None => SendResponse::success(token.clone(), format!("mock/{}", i)),
            })
            .collect();
        Ok(BatchResponse { responses })
    }
}
