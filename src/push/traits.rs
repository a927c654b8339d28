//! PushMessenger trait definition
//!
//! Abstract interface for delivering push notifications to device tokens.
//! Same pattern as `DocumentStore`: async trait + Send + Sync for
//! `Arc<dyn PushMessenger>` usage.

use super::types::{BatchResponse, MulticastMessage, PushError};
use async_trait::async_trait;

/// Delivers one message to many device tokens.
///
/// # Implementations
///
/// - [`FcmClient`](super::FcmClient): Firebase Cloud Messaging HTTP v1
/// - [`LogMessenger`](super::LogMessenger): logs messages, used when no
///   push provider is configured
/// - [`RecordingMessenger`](super::RecordingMessenger): records messages and
///   replays scripted failures (for tests)
#[async_trait]
pub trait PushMessenger: Send + Sync {
    /// Send `message` to each of its tokens independently.
    ///
    /// Per-token failures are reported inside the `BatchResponse`, one
    /// response per token in input order.
    ///
    /// # Errors
    ///
    /// Returns an error only when the call as a whole failed (credentials
    /// rejected, too many tokens).
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, PushError>;
}
