//! Caller identity extractor for Axum handlers.
//!
//! The service sits behind an auth proxy that verifies the end user and
//! forwards their uid in the `x-user-id` header.

use crate::api::handlers::{AppError, SharedState};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The uid of the user making the request.
///
/// ```rust,ignore
/// async fn my_handler(CurrentUser(uid): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}!", uid)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl CurrentUser {
    fn from_parts(parts: &Parts) -> Result<Self, AppError> {
        let uid = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
        Ok(Self(uid.to_string()))
    }
}

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &SharedState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = Self::from_parts(parts);
        async move { result }
    }
}
