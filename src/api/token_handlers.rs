//! Push token registration handlers

use crate::api::extractor::CurrentUser;
use crate::store::PushToken;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::handlers::{AppError, SharedState};

#[derive(Debug, Deserialize)]
pub struct RegisterTokenRequest {
    pub token: String,
    #[serde(default)]
    pub platform: Option<String>,
}

/// Register a device token for the caller, or refresh it.
///
/// Refreshing moves `updated_at` forward, which keeps the token out of the
/// stale sweep.
pub async fn register_token(
    State(state): State<SharedState>,
    user: CurrentUser,
    Json(req): Json<RegisterTokenRequest>,
) -> Result<Json<PushToken>, AppError> {
    let token = req.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("token is required".to_string()));
    }

    let record = PushToken {
        token: token.to_string(),
        user_id: user.0,
        platform: req.platform.filter(|p| !p.trim().is_empty()),
        updated_at: Utc::now(),
    };
    state.store.upsert_push_token(&record).await?;
    Ok(Json(record))
}

/// Forget one of the caller's device tokens (e.g. on sign-out)
pub async fn delete_token(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(token): Path<String>,
) -> Result<StatusCode, AppError> {
    let owned = state
        .store
        .list_user_push_tokens(&user.0)
        .await?
        .iter()
        .any(|t| t.token == token);
    if !owned {
        return Err(AppError::NotFound("Push token not found".to_string()));
    }
    state.store.delete_push_token(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
