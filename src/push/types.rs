//! Push message and response types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum number of device tokens in one multicast
pub const MAX_MULTICAST_TOKENS: usize = 500;

/// One notification fanned out to several device tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MulticastMessage {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
    /// String-only payload delivered to the app alongside the notification
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Error code reported for a single failed send
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PushErrorCode {
    RegistrationTokenNotRegistered,
    InvalidRegistrationToken,
    InvalidArgument,
    Other(String),
}

impl PushErrorCode {
    /// Whether the token that produced this error should be forgotten
    pub fn is_stale_token(&self) -> bool {
        matches!(
            self,
            PushErrorCode::RegistrationTokenNotRegistered
                | PushErrorCode::InvalidRegistrationToken
                | PushErrorCode::InvalidArgument
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            PushErrorCode::RegistrationTokenNotRegistered => {
                "messaging/registration-token-not-registered"
            }
            PushErrorCode::InvalidRegistrationToken => "messaging/invalid-registration-token",
            PushErrorCode::InvalidArgument => "messaging/invalid-argument",
            PushErrorCode::Other(code) => code,
        }
    }

    /// Map an FCM v1 `errorCode` (or legacy error name) onto a code
    pub fn from_fcm(code: &str) -> Self {
        match code {
            "UNREGISTERED" | "NotRegistered" => PushErrorCode::RegistrationTokenNotRegistered,
            "InvalidRegistration" => PushErrorCode::InvalidRegistrationToken,
            "INVALID_ARGUMENT" => PushErrorCode::InvalidArgument,
            other => PushErrorCode::Other(format!("messaging/{}", other.to_lowercase())),
        }
    }
}

impl fmt::Display for PushErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one token could not be reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub code: PushErrorCode,
    pub message: String,
}

/// Outcome of the send to a single token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResponse {
    pub token: String,
    pub message_id: Option<String>,
    pub error: Option<SendFailure>,
}

impl SendResponse {
    pub fn success(token: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failure(token: impl Into<String>, code: PushErrorCode, message: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            message_id: None,
            error: Some(SendFailure {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-token outcomes of a multicast, in token order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponse {
    pub responses: Vec<SendResponse>,
}

impl BatchResponse {
    pub fn success_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.responses.len() - self.success_count()
    }

    /// Tokens whose failure means the registration is gone for good
    pub fn stale_tokens(&self) -> Vec<String> {
        self.responses
            .iter()
            .filter(|r| r.error.as_ref().is_some_and(|e| e.code.is_stale_token()))
            .map(|r| r.token.clone())
            .collect()
    }
}

/// Failure of a whole multicast call
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("push request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("push credentials rejected (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("{0} tokens exceed the multicast limit of 500")]
    TooManyTokens(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_codes() {
        assert!(PushErrorCode::RegistrationTokenNotRegistered.is_stale_token());
        assert!(PushErrorCode::InvalidRegistrationToken.is_stale_token());
        assert!(PushErrorCode::InvalidArgument.is_stale_token());
        assert!(!PushErrorCode::Other("messaging/internal".into()).is_stale_token());
    }

    #[test]
    fn test_from_fcm() {
        assert_eq!(
            PushErrorCode::from_fcm("UNREGISTERED"),
            PushErrorCode::RegistrationTokenNotRegistered
        );
        assert_eq!(
            PushErrorCode::from_fcm("INVALID_ARGUMENT"),
            PushErrorCode::InvalidArgument
        );
        assert_eq!(
            PushErrorCode::from_fcm("QUOTA_EXCEEDED").as_str(),
            "messaging/quota_exceeded"
        );
    }

    #[test]
    fn test_batch_counts_and_stale_tokens() {
        let batch = BatchResponse {
            responses: vec![
                SendResponse::success("a", "projects/p/messages/1"),
                SendResponse::failure("b", PushErrorCode::RegistrationTokenNotRegistered, "gone"),
                SendResponse::failure("c", PushErrorCode::Other("messaging/internal".into()), "5xx"),
                SendResponse::failure("d", PushErrorCode::InvalidArgument, "bad token"),
            ],
        };
        assert_eq!(batch.success_count(), 1);
        assert_eq!(batch.failure_count(), 3);
        assert_eq!(batch.stale_tokens(), vec!["b".to_string(), "d".to_string()]);
    }
}
