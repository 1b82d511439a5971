use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::auth::MessageResponse;
use crate::api::views::{expand_notifications, NotificationView};
use crate::app::AppState;
use crate::auth::middleware::CurrentUser;
use crate::db::notification_repository::NotificationRepository;
use crate::db::post_repository::PostRepository;
use crate::db::user_repository::UserRepository;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub message: String,
    pub updated: u64,
}

fn notification_not_found() -> AppError {
    AppError::NotFound("Notification not found".into())
}

pub async fn process_list(
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
    notifications: &dyn NotificationRepository,
    recipient: &str,
) -> Result<Vec<NotificationView>, AppError> {
    let list = notifications.list_for(recipient).await?;
    expand_notifications(users, posts, list).await
}

/// Mark one of `recipient`'s notifications read. Other users' ids are
/// reported as missing.
pub async fn process_mark_read(
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
    notifications: &dyn NotificationRepository,
    recipient: &str,
    id: &str,
) -> Result<NotificationView, AppError> {
    let notification = notifications
        .mark_read(id, recipient)
        .await?
        .ok_or_else(notification_not_found)?;

    expand_notifications(users, posts, vec![notification])
        .await?
        .pop()
        .ok_or_else(notification_not_found)
}

pub async fn process_delete(
    notifications: &dyn NotificationRepository,
    recipient: &str,
    id: &str,
) -> Result<(), AppError> {
    if notifications.delete(id, recipient).await? {
        Ok(())
    } else {
        Err(notification_not_found())
    }
}

/// `GET /api/v1/notifications`
pub async fn list_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<NotificationView>>, AppError> {
    let list = process_list(
        state.user_repo.as_ref(),
        state.post_repo.as_ref(),
        state.notification_repo.as_ref(),
        &user.id,
    )
    .await?;
    Ok(Json(list))
}

/// `PUT /api/v1/notifications/{id}/read`
pub async fn mark_read_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<NotificationView>, AppError> {
    let notification = process_mark_read(
        state.user_repo.as_ref(),
        state.post_repo.as_ref(),
        state.notification_repo.as_ref(),
        &user.id,
        &id,
    )
    .await?;
    Ok(Json(notification))
}

/// `PUT /api/v1/notifications/read-all`
pub async fn mark_all_read_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let updated = state.notification_repo.mark_all_read(&user.id).await?;
    Ok(Json(MarkAllReadResponse {
        message: "Notifications marked as read".into(),
        updated,
    }))
}

/// `DELETE /api/v1/notifications/{id}`
pub async fn delete_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    process_delete(state.notification_repo.as_ref(), &user.id, &id).await?;
    Ok(MessageResponse::new("Notification deleted successfully"))
}
