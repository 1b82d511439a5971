use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generate a new document id.
///
/// UUID v7 ids are time ordered, so sorting on `_id` descending yields
/// newest-first order without a secondary index on `createdAt`.
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

fn default_headline() -> String {
    "Linkedin User".to_string()
}

fn default_location() -> String {
    "Earth".to_string()
}

/// A position listed on a user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// A school listed on a user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub field_of_study: String,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
}

/// A user account stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Never leaves the server.
    pub password: String,
    #[serde(default)]
    pub profile_picture: String,
    #[serde(default)]
    pub banner_img: String,
    #[serde(default = "default_headline")]
    pub headline: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    /// Ids of connected users.
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default)]
    pub profile_views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh account with profile defaults.
    pub fn new(name: String, username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name,
            username,
            email,
            password: password_hash,
            profile_picture: String::new(),
            banner_img: String::new(),
            headline: default_headline(),
            location: default_location(),
            about: String::new(),
            skills: Vec::new(),
            experience: Vec::new(),
            education: Vec::new(),
            connections: Vec::new(),
            profile_views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_connected_to(&self, user_id: &str) -> bool {
        self.connections.iter().any(|c| c == user_id)
    }
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_img: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<Vec<Experience>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub education: Option<Vec<Education>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.headline.is_none()
            && self.about.is_none()
            && self.location.is_none()
            && self.profile_picture.is_none()
            && self.banner_img.is_none()
            && self.skills.is_none()
            && self.experience.is_none()
            && self.education.is_none()
    }
}

/// Kind of media attached to a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    None,
    Image,
    Video,
}

/// A comment embedded in a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    /// Id of the commenting user.
    pub user: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(user: String, content: String) -> Self {
        Self {
            id: new_id(),
            user,
            content,
            created_at: Utc::now(),
        }
    }
}

/// A post stored in the `posts` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    /// Id of the authoring user.
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub media_type: MediaType,
    /// Ids of users who liked the post. Treated as a set.
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|l| l == user_id)
    }
}

/// Lifecycle of a connection request: pending, then accepted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Pending => "pending",
            ConnectionStatus::Accepted => "accepted",
            ConnectionStatus::Rejected => "rejected",
        }
    }
}

/// A connection request stored in the `connectionrequests` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender: String,
    pub recipient: String,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConnectionRequest {
    pub fn pending(sender: String, recipient: String) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            sender,
            recipient,
            status: ConnectionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationType {
    Like,
    Comment,
    ConnectionAccepted,
}

/// A notification stored in the `notifications` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub recipient: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default)]
    pub related_user: Option<String>,
    #[serde(default)]
    pub related_post: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient: String,
        kind: NotificationType,
        related_user: Option<String>,
        related_post: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            recipient,
            kind,
            related_user,
            related_post,
            read: false,
            created_at: now,
            updated_at: now,
        }
    }
}
