use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::auth::MessageResponse;
use crate::api::views::{expand_requests, ConnectionRequestView, UserSummary};
use crate::app::AppState;
use crate::auth::middleware::CurrentUser;
use crate::db::connection_repository::ConnectionRepository;
use crate::db::models::{
    ConnectionRequest, ConnectionStatus, Notification, NotificationType, User,
};
use crate::db::notification_repository::NotificationRepository;
use crate::db::user_repository::UserRepository;
use crate::error::AppError;
use crate::mail::mailer::{send_best_effort, Mailer};
use crate::mail::templates::{connection_accepted_email, profile_url};

/// Relationship between the caller and another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ConnectionStatusResponse {
    fn plain(status: &str) -> Self {
        Self {
            status: status.to_string(),
            request_id: None,
        }
    }
}

fn request_not_found() -> AppError {
    AppError::NotFound("Connection request not found".into())
}

/// Send a connection request from `sender` to `recipient_id`.
pub async fn process_send_request(
    users: &dyn UserRepository,
    connections: &dyn ConnectionRepository,
    sender: &User,
    recipient_id: &str,
) -> Result<ConnectionRequest, AppError> {
    if sender.id == recipient_id {
        return Err(AppError::BadRequest(
            "You can't send a request to yourself".into(),
        ));
    }

    let recipient = users
        .find_by_id(recipient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if sender.is_connected_to(&recipient.id) {
        return Err(AppError::BadRequest("You are already connected".into()));
    }

    let outgoing = connections.find_pending(&sender.id, &recipient.id).await?;
    let incoming = connections.find_pending(&recipient.id, &sender.id).await?;
    if outgoing.is_some() || incoming.is_some() {
        return Err(AppError::BadRequest(
            "A connection request already exists".into(),
        ));
    }

    let request = ConnectionRequest::pending(sender.id.clone(), recipient.id);
    connections.create(request.clone()).await?;
    tracing::info!("User {} sent connection request {}", sender.username, request.id);

    Ok(request)
}

/// Load a request addressed to `caller` that is still pending.
async fn pending_request_for(
    connections: &dyn ConnectionRepository,
    caller: &User,
    request_id: &str,
    action: &str,
) -> Result<ConnectionRequest, AppError> {
    let request = connections
        .find_by_id(request_id)
        .await?
        .ok_or_else(request_not_found)?;

    if request.recipient != caller.id {
        return Err(AppError::Forbidden(format!(
            "Not authorized to {action} this request"
        )));
    }

    if request.status != ConnectionStatus::Pending {
        return Err(AppError::BadRequest(
            "This request has already been processed".into(),
        ));
    }

    Ok(request)
}

/// Accept a pending request: connect both users, then notify the sender.
#[allow(clippy::too_many_arguments)]
pub async fn process_accept(
    users: &dyn UserRepository,
    connections: &dyn ConnectionRepository,
    notifications: &dyn NotificationRepository,
    mailer: &dyn Mailer,
    client_url: &str,
    caller: &User,
    request_id: &str,
) -> Result<(), AppError> {
    let request = pending_request_for(connections, caller, request_id, "accept").await?;

    connections
        .set_status(&request.id, ConnectionStatus::Accepted)
        .await?;
    users.add_connection(&request.sender, &caller.id).await?;
    users.add_connection(&caller.id, &request.sender).await?;

    notifications
        .create(Notification::new(
            request.sender.clone(),
            NotificationType::ConnectionAccepted,
            Some(caller.id.clone()),
            None,
        ))
        .await?;

    match users.find_by_id(&request.sender).await? {
        Some(sender) => {
            send_best_effort(
                mailer,
                connection_accepted_email(
                    &sender.email,
                    &sender.name,
                    &caller.name,
                    &profile_url(client_url, &caller.username),
                ),
            )
            .await
        }
        None => tracing::warn!("Sender {} of request {} no longer exists", request.sender, request.id),
    }

    tracing::info!("User {} accepted connection request {}", caller.username, request.id);
    Ok(())
}

pub async fn process_reject(
    connections: &dyn ConnectionRepository,
    caller: &User,
    request_id: &str,
) -> Result<(), AppError> {
    let request = pending_request_for(connections, caller, request_id, "reject").await?;
    connections
        .set_status(&request.id, ConnectionStatus::Rejected)
        .await
}

pub async fn process_pending_requests(
    users: &dyn UserRepository,
    connections: &dyn ConnectionRepository,
    caller: &User,
) -> Result<Vec<ConnectionRequestView>, AppError> {
    let pending = connections.list_pending_for(&caller.id).await?;
    expand_requests(users, pending).await
}

pub async fn process_list_connections(
    users: &dyn UserRepository,
    caller: &User,
) -> Result<Vec<UserSummary>, AppError> {
    Ok(users
        .find_by_ids(&caller.connections)
        .await?
        .iter()
        .map(UserSummary::from)
        .collect())
}

/// Remove the connection in both directions.
pub async fn process_remove(
    users: &dyn UserRepository,
    caller: &User,
    other_id: &str,
) -> Result<(), AppError> {
    users.remove_connection(&caller.id, other_id).await?;
    users.remove_connection(other_id, &caller.id).await?;
    Ok(())
}

pub async fn process_status(
    connections: &dyn ConnectionRepository,
    caller: &User,
    other_id: &str,
) -> Result<ConnectionStatusResponse, AppError> {
    if caller.is_connected_to(other_id) {
        return Ok(ConnectionStatusResponse::plain("connected"));
    }

    if connections.find_pending(&caller.id, other_id).await?.is_some() {
        return Ok(ConnectionStatusResponse::plain("pending"));
    }

    if let Some(request) = connections.find_pending(other_id, &caller.id).await? {
        return Ok(ConnectionStatusResponse {
            status: "received".to_string(),
            request_id: Some(request.id),
        });
    }

    Ok(ConnectionStatusResponse::plain("not_connected"))
}

/// `POST /api/v1/connections/request/{user_id}`
pub async fn send_request_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    process_send_request(
        state.user_repo.as_ref(),
        state.connection_repo.as_ref(),
        &user,
        &user_id,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        MessageResponse::new("Connection request sent successfully"),
    ))
}

/// `PUT /api/v1/connections/accept/{request_id}`
pub async fn accept_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    process_accept(
        state.user_repo.as_ref(),
        state.connection_repo.as_ref(),
        state.notification_repo.as_ref(),
        state.mailer.as_ref(),
        &state.client_url,
        &user,
        &request_id,
    )
    .await?;
    Ok(MessageResponse::new("Connection accepted successfully"))
}

/// `PUT /api/v1/connections/reject/{request_id}`
pub async fn reject_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    process_reject(state.connection_repo.as_ref(), &user, &request_id).await?;
    Ok(MessageResponse::new("Connection request rejected"))
}

/// `GET /api/v1/connections/requests`
pub async fn pending_requests_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ConnectionRequestView>>, AppError> {
    let requests = process_pending_requests(
        state.user_repo.as_ref(),
        state.connection_repo.as_ref(),
        &user,
    )
    .await?;
    Ok(Json(requests))
}

/// `GET /api/v1/connections`
pub async fn list_connections_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let list = process_list_connections(state.user_repo.as_ref(), &user).await?;
    Ok(Json(list))
}

/// `DELETE /api/v1/connections/{user_id}`
pub async fn remove_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    process_remove(state.user_repo.as_ref(), &user, &user_id).await?;
    Ok(MessageResponse::new("Connection removed successfully"))
}

/// `GET /api/v1/connections/status/{user_id}`
pub async fn status_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<ConnectionStatusResponse>, AppError> {
    let status = process_status(state.connection_repo.as_ref(), &user, &user_id).await?;
    Ok(Json(status))
}
