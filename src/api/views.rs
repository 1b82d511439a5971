use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{
    ConnectionRequest, ConnectionStatus, Education, Experience, MediaType, Notification,
    NotificationType, Post, User,
};
use crate::db::post_repository::PostRepository;
use crate::db::user_repository::UserRepository;
use crate::error::AppError;

/// The display fields of a user, embedded wherever another record references one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub username: String,
    pub profile_picture: String,
    pub headline: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            profile_picture: user.profile_picture.clone(),
            headline: user.headline.clone(),
        }
    }
}

/// A user as returned by the API: everything except the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub profile_picture: String,
    pub banner_img: String,
    pub headline: String,
    pub location: String,
    pub about: String,
    pub skills: Vec<String>,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub connections: Vec<String>,
    pub profile_views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            email: user.email,
            profile_picture: user.profile_picture,
            banner_img: user.banner_img,
            headline: user.headline,
            location: user.location,
            about: user.about,
            skills: user.skills,
            experience: user.experience,
            education: user.education,
            connections: user.connections,
            profile_views: user.profile_views,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: Option<UserSummary>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A post with its author and commenters expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(rename = "_id")]
    pub id: String,
    pub author: Option<UserSummary>,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub media_type: MediaType,
    pub likes: Vec<String>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields of a post shown next to a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub content: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(rename = "_id")]
    pub id: String,
    pub recipient: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub related_user: Option<UserSummary>,
    pub related_post: Option<PostSummary>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequestView {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender: Option<UserSummary>,
    pub recipient: String,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
}

/// Load the summaries of every referenced user in one query.
pub async fn load_summaries<'a>(
    users: &dyn UserRepository,
    ids: impl IntoIterator<Item = &'a String>,
) -> Result<HashMap<String, UserSummary>, AppError> {
    let ids: Vec<String> = ids
        .into_iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    Ok(users
        .find_by_ids(&ids)
        .await?
        .iter()
        .map(|u| (u.id.clone(), UserSummary::from(u)))
        .collect())
}

fn build_post_view(post: Post, summaries: &HashMap<String, UserSummary>) -> PostView {
    PostView {
        author: summaries.get(&post.author).cloned(),
        comments: post
            .comments
            .into_iter()
            .map(|c| CommentView {
                user: summaries.get(&c.user).cloned(),
                id: c.id,
                content: c.content,
                created_at: c.created_at,
            })
            .collect(),
        id: post.id,
        content: post.content,
        image: post.image,
        video: post.video,
        media_type: post.media_type,
        likes: post.likes,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

/// Expand authors and commenters of several posts, preserving order.
pub async fn expand_posts(
    users: &dyn UserRepository,
    posts: Vec<Post>,
) -> Result<Vec<PostView>, AppError> {
    let referenced: Vec<&String> = posts
        .iter()
        .flat_map(|p| std::iter::once(&p.author).chain(p.comments.iter().map(|c| &c.user)))
        .collect();
    let summaries = load_summaries(users, referenced).await?;

    Ok(posts
        .into_iter()
        .map(|p| build_post_view(p, &summaries))
        .collect())
}

pub async fn expand_post(users: &dyn UserRepository, post: Post) -> Result<PostView, AppError> {
    let mut views = expand_posts(users, vec![post]).await?;
    views
        .pop()
        .ok_or_else(|| AppError::Internal("Post expansion produced no result".into()))
}

/// Expand related users and posts of notifications, preserving order.
pub async fn expand_notifications(
    users: &dyn UserRepository,
    posts: &dyn PostRepository,
    notifications: Vec<Notification>,
) -> Result<Vec<NotificationView>, AppError> {
    let summaries =
        load_summaries(users, notifications.iter().filter_map(|n| n.related_user.as_ref())).await?;

    let post_ids: Vec<String> = notifications
        .iter()
        .filter_map(|n| n.related_post.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let post_summaries: HashMap<String, PostSummary> = posts
        .find_by_ids(&post_ids)
        .await?
        .into_iter()
        .map(|post| {
            (
                post.id.clone(),
                PostSummary {
                    id: post.id,
                    content: post.content,
                    image: post.image,
                },
            )
        })
        .collect();

    Ok(notifications
        .into_iter()
        .map(|n| NotificationView {
            related_user: n.related_user.as_ref().and_then(|id| summaries.get(id).cloned()),
            related_post: n
                .related_post
                .as_ref()
                .and_then(|id| post_summaries.get(id).cloned()),
            id: n.id,
            recipient: n.recipient,
            kind: n.kind,
            read: n.read,
            created_at: n.created_at,
        })
        .collect())
}

/// Expand the senders of connection requests, preserving order.
pub async fn expand_requests(
    users: &dyn UserRepository,
    requests: Vec<ConnectionRequest>,
) -> Result<Vec<ConnectionRequestView>, AppError> {
    let summaries = load_summaries(users, requests.iter().map(|r| &r.sender)).await?;

    Ok(requests
        .into_iter()
        .map(|r| ConnectionRequestView {
            sender: summaries.get(&r.sender).cloned(),
            id: r.id,
            recipient: r.recipient,
            status: r.status,
            created_at: r.created_at,
        })
        .collect())
}
