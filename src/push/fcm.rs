//! Firebase Cloud Messaging (HTTP v1) push client
//!
//! Sends one `messages:send` request per token, concurrently, and folds the
//! results into a `BatchResponse`, mirroring FCM's send-each-for-multicast.
//!
//! Configuration (see `FcmConfig`):
//! - `FCM_PROJECT_ID`: Firebase project
//! - `FCM_ACCESS_TOKEN`: OAuth2 bearer token with the messaging scope
//! - `FCM_ENDPOINT` (default: `https://fcm.googleapis.com`)

use super::traits::PushMessenger;
use super::types::{
    BatchResponse, MulticastMessage, PushError, PushErrorCode, SendResponse, MAX_MULTICAST_TOKENS,
};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";

/// FCM HTTP v1 client.
///
/// Cheaply cloneable (shares the reqwest client internally).
#[derive(Clone)]
pub struct FcmClient {
    client: reqwest::Client,
    url: String,
    access_token: String,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    data: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResult {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// Outcome of a single token send before folding into the batch
enum TokenOutcome {
    Sent(SendResponse),
    Unauthorized(u16),
}

impl FcmClient {
    /// Create a client for `projects/{project_id}` at `endpoint`.
    pub fn new(endpoint: &str, project_id: &str, access_token: &str) -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let url = format!(
            "{}/v1/projects/{}/messages:send",
            endpoint.trim_end_matches('/'),
            project_id
        );

        Ok(Self {
            client,
            url,
            access_token: access_token.to_string(),
        })
    }

    async fn send_one(&self, token: &str, message: &MulticastMessage) -> TokenOutcome {
        let body = SendRequest {
            message: FcmMessage {
                token,
                notification: FcmNotification {
                    title: &message.title,
                    body: &message.body,
                },
                data: &message.data,
            },
        };

        let response = match self
            .client
            .post(&self.url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return TokenOutcome::Sent(SendResponse::failure(
                    token,
                    PushErrorCode::Other("messaging/transport-error".into()),
                    e.to_string(),
                ))
            }
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return TokenOutcome::Unauthorized(status.as_u16());
        }

        if status.is_success() {
            return TokenOutcome::Sent(match response.json::<SendResult>().await {
                Ok(result) => SendResponse::success(token, result.name),
                Err(e) => SendResponse::failure(
                    token,
                    PushErrorCode::Other("messaging/invalid-response".into()),
                    e.to_string(),
                ),
            });
        }

        let text = response.text().await.unwrap_or_default();
        let (code, detail) = classify_error(status, &text);
        TokenOutcome::Sent(SendResponse::failure(token, code, detail))
    }
}

/// Map an FCM error response onto a push error code and message
fn classify_error(status: StatusCode, body: &str) -> (PushErrorCode, String) {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();

    let fcm_code = parsed.as_ref().and_then(|env| {
        env.error
            .details
            .iter()
            .find_map(|d| d.error_code.clone())
            .or_else(|| env.error.status.clone())
    });
    let message = parsed
        .as_ref()
        .map(|env| env.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("FCM returned {}", status.as_u16()));

    let code = match fcm_code {
        Some(code) if code != "NOT_FOUND" => PushErrorCode::from_fcm(&code),
        _ if status == StatusCode::NOT_FOUND => PushErrorCode::RegistrationTokenNotRegistered,
        _ if status == StatusCode::BAD_REQUEST => PushErrorCode::InvalidArgument,
        _ => PushErrorCode::Other(format!("messaging/http-{}", status.as_u16())),
    };
    (code, message)
}

#[async_trait]
impl PushMessenger for FcmClient {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, PushError> {
        if message.tokens.len() > MAX_MULTICAST_TOKENS {
            return Err(PushError::TooManyTokens(message.tokens.len()));
        }

        let outcomes = join_all(
            message
                .tokens
                .iter()
                .map(|token| self.send_one(token, message)),
        )
        .await;

        let mut responses = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                TokenOutcome::Sent(r) => responses.push(r),
                TokenOutcome::Unauthorized(status) => {
                    return Err(PushError::Unauthorized { status })
                }
            }
        }

        let batch = BatchResponse { responses };
        debug!(
            success = batch.success_count(),
            failure = batch.failure_count(),
            "FCM multicast sent"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SEND_PATH: &str = "/v1/projects/demo/messages:send";

    fn message(tokens: &[&str]) -> MulticastMessage {
        let mut data = BTreeMap::new();
        data.insert("projectId".to_string(), "p-1".to_string());
        data.insert("stepId".to_string(), String::new());
        data.insert("type".to_string(), "project_created".to_string());
        MulticastMessage {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            title: "Project Created!".to_string(),
            body: "\"Demo\" is ready to go.".to_string(),
            data,
        }
    }

    fn unregistered() -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": 404,
                "message": "Requested entity was not found.",
                "status": "NOT_FOUND",
                "details": [{
                    "@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError",
                    "errorCode": "UNREGISTERED"
                }]
            }
        }))
    }

    #[test]
    fn test_url_building() {
        let client = FcmClient::new("https://fcm.example.com/", "demo", "t").unwrap();
        assert_eq!(
            client.url,
            "https://fcm.example.com/v1/projects/demo/messages:send"
        );
    }

    #[tokio::test]
    async fn test_send_multicast_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "message": {
                    "notification": {"title": "Project Created!"},
                    "data": {"type": "project_created"}
                }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "projects/demo/messages/42"})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = FcmClient::new(&server.uri(), "demo", "secret").unwrap();
        let batch = client.send_multicast(&message(&["a", "b"])).await.unwrap();

        assert_eq!(batch.success_count(), 2);
        assert_eq!(batch.failure_count(), 0);
        assert_eq!(
            batch.responses[0].message_id.as_deref(),
            Some("projects/demo/messages/42")
        );
    }

    #[tokio::test]
    async fn test_unregistered_and_invalid_tokens_are_stale() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .and(body_partial_json(json!({"message": {"token": "gone"}})))
            .respond_with(unregistered())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .and(body_partial_json(json!({"message": {"token": "garbage"}})))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "The registration token is not a valid FCM registration token",
                    "status": "INVALID_ARGUMENT",
                    "details": [{"errorCode": "INVALID_ARGUMENT"}]
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .and(body_partial_json(json!({"message": {"token": "ok"}})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"name": "projects/demo/messages/1"})),
            )
            .mount(&server)
            .await;

        let client = FcmClient::new(&server.uri(), "demo", "secret").unwrap();
        let batch = client
            .send_multicast(&message(&["ok", "gone", "garbage"]))
            .await
            .unwrap();

        assert_eq!(batch.success_count(), 1);
        assert_eq!(batch.failure_count(), 2);
        let gone = batch.responses[1].error.as_ref().unwrap();
        assert_eq!(gone.code, PushErrorCode::RegistrationTokenNotRegistered);
        assert_eq!(gone.message, "Requested entity was not found.");
        assert_eq!(
            batch.responses[2].error.as_ref().unwrap().code,
            PushErrorCode::InvalidArgument
        );
        assert_eq!(
            batch.stale_tokens(),
            vec!["gone".to_string(), "garbage".to_string()]
        );
    }

    #[tokio::test]
    async fn test_server_error_is_not_stale() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = FcmClient::new(&server.uri(), "demo", "secret").unwrap();
        let batch = client.send_multicast(&message(&["a"])).await.unwrap();

        let failure = batch.responses[0].error.as_ref().unwrap();
        assert_eq!(failure.code.as_str(), "messaging/http-503");
        assert!(batch.stale_tokens().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_success_body_fails_only_that_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = FcmClient::new(&server.uri(), "demo", "secret").unwrap();
        let batch = client.send_multicast(&message(&["a"])).await.unwrap();

        let failure = batch.responses[0].error.as_ref().unwrap();
        assert_eq!(failure.code.as_str(), "messaging/invalid-response");
        assert!(batch.stale_tokens().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_credentials_fail_whole_call() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(SEND_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = FcmClient::new(&server.uri(), "demo", "expired").unwrap();
        let err = client.send_multicast(&message(&["a"])).await.unwrap_err();
        assert!(matches!(err, PushError::Unauthorized { status: 401 }));
    }

    #[tokio::test]
    async fn test_too_many_tokens_rejected_without_requests() {
        let client = FcmClient::new("http://127.0.0.1:9", "demo", "secret").unwrap();
        let tokens: Vec<String> = (0..=MAX_MULTICAST_TOKENS).map(|i| format!("t{}", i)).collect();
        let msg = MulticastMessage {
            tokens,
            ..message(&[])
        };
        let err = client.send_multicast(&msg).await.unwrap_err();
        assert!(matches!(err, PushError::TooManyTokens(501)));
    }
}
