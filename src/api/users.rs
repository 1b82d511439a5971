use axum::extract::{Path, State};
use axum::Json;

use crate::api::views::{UserProfile, UserSummary};
use crate::app::AppState;
use crate::auth::middleware::CurrentUser;
use crate::db::models::{ProfileUpdate, User};
use crate::db::user_repository::UserRepository;
use crate::error::AppError;
use crate::storage::client::StorageClient;
use crate::storage::media::{
    is_data_url, remove_stored_media, store_if_data_url, MediaKind, MediaUrls,
};

/// Maximum number of connection suggestions returned.
pub const SUGGESTION_LIMIT: i64 = 10;

/// Users the caller is not connected to yet.
pub async fn process_suggestions(
    users: &dyn UserRepository,
    current: &User,
) -> Result<Vec<UserSummary>, AppError> {
    let mut exclude = current.connections.clone();
    exclude.push(current.id.clone());

    Ok(users
        .list_excluding(&exclude, SUGGESTION_LIMIT)
        .await?
        .iter()
        .map(UserSummary::from)
        .collect())
}

/// Fetch a profile by username, counting the view.
pub async fn process_public_profile(
    users: &dyn UserRepository,
    username: &str,
) -> Result<UserProfile, AppError> {
    users
        .record_profile_view(username)
        .await?
        .map(UserProfile::from)
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Apply a partial profile update for the caller.
///
/// Image fields sent as data URLs are uploaded first; the previously stored
/// image is removed once it has been replaced.
pub async fn process_update_profile(
    users: &dyn UserRepository,
    storage: &dyn StorageClient,
    media_urls: &MediaUrls,
    current: &User,
    mut update: ProfileUpdate,
) -> Result<UserProfile, AppError> {
    if let Some(name) = update.name.as_mut() {
        *name = name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".into()));
        }
    }

    if update.is_empty() {
        return Ok(UserProfile::from(current.clone()));
    }

    let mut uploaded = Vec::new();
    let updated = match upload_and_apply(users, storage, media_urls, current, update, &mut uploaded)
        .await
    {
        Ok(updated) => updated,
        Err(e) => {
            for url in &uploaded {
                remove_stored_media(storage, media_urls, url).await;
            }
            return Err(e);
        }
    };

    if updated.profile_picture != current.profile_picture {
        remove_stored_media(storage, media_urls, &current.profile_picture).await;
    }
    if updated.banner_img != current.banner_img {
        remove_stored_media(storage, media_urls, &current.banner_img).await;
    }

    Ok(UserProfile::from(updated))
}

/// Upload the image fields sent as data URLs, recording each new object in
/// `uploaded`, then write the update.
async fn upload_and_apply(
    users: &dyn UserRepository,
    storage: &dyn StorageClient,
    media_urls: &MediaUrls,
    current: &User,
    mut update: ProfileUpdate,
    uploaded: &mut Vec<String>,
) -> Result<User, AppError> {
    for (field, prefix) in [
        (&mut update.profile_picture, "profiles"),
        (&mut update.banner_img, "banners"),
    ] {
        let Some(value) = field.take() else {
            continue;
        };
        let fresh = is_data_url(&value);
        let url = store_if_data_url(storage, media_urls, prefix, value, MediaKind::Image).await?;
        if fresh {
            uploaded.push(url.clone());
        }
        *field = Some(url);
    }

    users
        .update_profile(&current.id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// `GET /api/v1/users/suggestions`
pub async fn suggestions_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let suggestions = process_suggestions(state.user_repo.as_ref(), &user).await?;
    Ok(Json(suggestions))
}

/// `GET /api/v1/users/{username}`
pub async fn public_profile_handler(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(username): Path<String>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = process_public_profile(state.user_repo.as_ref(), &username).await?;
    Ok(Json(profile))
}

/// `PUT /api/v1/users/profile`
pub async fn update_profile_handler(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    let profile = process_update_profile(
        state.user_repo.as_ref(),
        state.storage_client.as_ref(),
        &state.media_urls,
        &user,
        update,
    )
    .await?;
    Ok(Json(profile))
}
