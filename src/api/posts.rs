use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::auth::MessageResponse;
use crate::api::views::{expand_post, expand_posts, PostView};
use crate::app::AppState;
use crate::auth::middleware::CurrentUser;
use crate::db::models::{new_id, Comment, MediaType, Notification, NotificationType, Post, User};
use crate::db::notification_repository::NotificationRepository;
use crate::db::post_repository::PostRepository;
use crate::db::user_repository::UserRepository;
use crate::error::AppError;
use crate::mail::mailer::{send_best_effort, Mailer};
use crate::mail::templates::{comment_notification_email, post_url};
use crate::storage::client::StorageClient;
use crate::storage::media::{
    is_data_url, remove_stored_media, store_if_data_url, MediaKind, MediaUrls,
};

pub const DEFAULT_FEED_LIMIT: i64 = 50;
pub const MAX_FEED_LIMIT: i64 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
}

impl FeedQuery {
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_FEED_LIMIT)
            .clamp(1, MAX_FEED_LIMIT)
    }
}

/// Request body for `POST /api/v1/posts/create`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    /// Accepted for compatibility; the stored type follows the media sent.
    #[serde(default)]
    pub media_type: Option<MediaType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

fn post_not_found() -> AppError {
    AppError::NotFound("Post not found".into())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn process_feed(
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
    query: &FeedQuery,
) -> Result<Vec<PostView>, AppError> {
    let recent = posts.list_recent(query.effective_limit()).await?;
    expand_posts(users, recent).await
}

/// Create a post, uploading any attached media first.
///
/// When both an image and a video are sent the image is kept.
pub async fn process_create_post(
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
    storage: &dyn StorageClient,
    media_urls: &MediaUrls,
    author: &User,
    request: CreatePostRequest,
) -> Result<PostView, AppError> {
    let image = non_empty(request.image);
    let video = non_empty(request.video);

    if request.content.trim().is_empty() && image.is_none() && video.is_none() {
        return Err(AppError::BadRequest("Post content cannot be empty".into()));
    }

    let (image, video, media_type) = match (image, video) {
        (Some(image), _) => (Some(image), None, MediaType::Image),
        (None, Some(video)) => (None, Some(video), MediaType::Video),
        (None, None) => (None, None, MediaType::None),
    };
    let uploads_media = image.iter().chain(video.iter()).any(|v| is_data_url(v));

    let image = match image {
        Some(image) => Some(
            store_if_data_url(storage, media_urls, "posts", image, MediaKind::Image).await?,
        ),
        None => None,
    };
    let video = match video {
        Some(video) => Some(
            store_if_data_url(storage, media_urls, "posts", video, MediaKind::Video).await?,
        ),
        None => None,
    };

    let now = Utc::now();
    let post = Post {
        id: new_id(),
        author: author.id.clone(),
        content: request.content,
        image,
        video,
        media_type,
        likes: Vec::new(),
        comments: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    if let Err(e) = posts.create(post.clone()).await {
        if uploads_media {
            for url in post.image.iter().chain(post.video.iter()) {
                remove_stored_media(storage, media_urls, url).await;
            }
        }
        return Err(e);
    }
    tracing::info!("User {} created post {}", author.username, post.id);

    expand_post(users, post).await
}

pub async fn process_get_post(
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
    post_id: &str,
) -> Result<PostView, AppError> {
    let post = posts.find_by_id(post_id).await?.ok_or_else(post_not_found)?;
    expand_post(users, post).await
}

/// Delete one of the caller's posts together with its media and notifications.
pub async fn process_delete_post(
    posts: &dyn PostRepository,
    notifications: &dyn NotificationRepository,
    storage: &dyn StorageClient,
    media_urls: &MediaUrls,
    caller: &User,
    post_id: &str,
) -> Result<(), AppError> {
    let post = posts.find_by_id(post_id).await?.ok_or_else(post_not_found)?;

    if post.author != caller.id {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this post".into(),
        ));
    }

    for url in post.image.iter().chain(post.video.iter()) {
        remove_stored_media(storage, media_urls, url).await;
    }

    if !posts.delete(&post.id).await? {
        return Err(post_not_found());
    }

    let removed = notifications.delete_for_post(&post.id).await?;
    tracing::info!(
        "User {} deleted post {} ({removed} notifications removed)",
        caller.username,
        post.id
    );

    Ok(())
}

/// Append a comment, notifying the author when someone else commented.
#[allow(clippy::too_many_arguments)]
pub async fn process_comment(
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
    notifications: &dyn NotificationRepository,
    mailer: &dyn Mailer,
    client_url: &str,
    commenter: &User,
    post_id: &str,
    request: CommentRequest,
) -> Result<PostView, AppError> {
    let content = request.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::BadRequest("Comment content cannot be empty".into()));
    }

    let comment = Comment::new(commenter.id.clone(), content);
    let post = posts
        .add_comment(post_id, &comment)
        .await?
        .ok_or_else(post_not_found)?;

    if post.author != commenter.id {
        notifications
            .create(Notification::new(
                post.author.clone(),
                NotificationType::Comment,
                Some(commenter.id.clone()),
                Some(post.id.clone()),
            ))
            .await?;

        match users.find_by_id(&post.author).await? {
            Some(author) => {
                send_best_effort(
                    mailer,
                    comment_notification_email(
                        &author.email,
                        &author.name,
                        &commenter.name,
                        &post_url(client_url, &post.id),
                        &comment.content,
                    ),
                )
                .await
            }
            None => tracing::warn!("Author {} of post {} no longer exists", post.author, post.id),
        }
    }

    expand_post(users, post).await
}

/// Toggle the caller's like on a post.
pub async fn process_like(
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
    notifications: &dyn NotificationRepository,
    liker: &User,
    post_id: &str,
) -> Result<PostView, AppError> {
    let post = posts.find_by_id(post_id).await?.ok_or_else(post_not_found)?;

    let updated = if post.is_liked_by(&liker.id) {
        posts.remove_like(&post.id, &liker.id).await?
    } else {
        match posts.add_like(&post.id, &liker.id).await? {
            Some(updated) => {
                if post.author != liker.id {
                    notifications
                        .create(Notification::new(
                            post.author.clone(),
                            NotificationType::Like,
                            Some(liker.id.clone()),
                            Some(post.id.clone()),
                        ))
                        .await?;
                }
                Some(updated)
            }
            // Another request added this like first.
            None => posts.find_by_id(&post.id).await?,
        }
    };

    expand_post(users, updated.ok_or_else(post_not_found)?).await
}

/// `GET /api/v1/posts`
pub async fn feed_handler(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let feed = process_feed(state.user_repo.as_ref(), state.post_repo.as_ref(), &query).await?;
    Ok(Json(feed))
}

/// `POST /api/v1/posts/create`
pub async fn create_post_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostView>), AppError> {
    let post = process_create_post(
        state.user_repo.as_ref(),
        state.post_repo.as_ref(),
        state.storage_client.as_ref(),
        &state.media_urls,
        &user,
        request,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// `GET /api/v1/posts/{id}`
pub async fn get_post_handler(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PostView>, AppError> {
    let post = process_get_post(state.user_repo.as_ref(), state.post_repo.as_ref(), &id).await?;
    Ok(Json(post))
}

/// `DELETE /api/v1/posts/delete/{id}`
pub async fn delete_post_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    process_delete_post(
        state.post_repo.as_ref(),
        state.notification_repo.as_ref(),
        state.storage_client.as_ref(),
        &state.media_urls,
        &user,
        &id,
    )
    .await?;
    Ok(MessageResponse::new("Post deleted successfully"))
}

/// `POST /api/v1/posts/{id}/comment`
pub async fn comment_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<PostView>, AppError> {
    let post = process_comment(
        state.user_repo.as_ref(),
        state.post_repo.as_ref(),
        state.notification_repo.as_ref(),
        state.mailer.as_ref(),
        &state.client_url,
        &user,
        &id,
        request,
    )
    .await?;
    Ok(Json(post))
}

/// `POST /api/v1/posts/{id}/like`
pub async fn like_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PostView>, AppError> {
    let post = process_like(
        state.user_repo.as_ref(),
        state.post_repo.as_ref(),
        state.notification_repo.as_ref(),
        &user,
        &id,
    )
    .await?;
    Ok(Json(post))
}
