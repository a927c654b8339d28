//! Notification API handlers

use crate::api::extractor::CurrentUser;
use crate::store::Notification;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::handlers::{AppError, SharedState};

/// List the caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<SharedState>,
    user: CurrentUser,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(state.store.list_user_notifications(&user.0).await?))
}

/// Mark one of the caller's notifications as read
pub async fn mark_read(
    State(state): State<SharedState>,
    user: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let owned = state
        .store
        .list_user_notifications(&user.0)
        .await?
        .iter()
        .any(|n| n.id == notification_id);
    if !owned || !state.store.mark_notification_read(notification_id).await? {
        return Err(AppError::NotFound(format!(
            "Notification {} not found",
            notification_id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
