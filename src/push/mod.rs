//! Push notification delivery
//!
//! Architecture follows the project pattern (trait + impl + mock):
//! - `PushMessenger` trait: multicast one message to many device tokens
//! - `FcmClient`: Firebase Cloud Messaging HTTP v1
//! - `LogMessenger`: logging fallback when FCM is not configured
//! - `RecordingMessenger`: scripted mock for tests

pub mod fcm;
pub mod log_messenger;
pub mod mock;
pub mod traits;
pub mod types;

pub use fcm::FcmClient;
pub use log_messenger::LogMessenger;
pub use mock::RecordingMessenger;
pub use traits::PushMessenger;
pub use types::{
    BatchResponse, MulticastMessage, PushError, PushErrorCode, SendFailure, SendResponse,
    MAX_MULTICAST_TOKENS,
};
