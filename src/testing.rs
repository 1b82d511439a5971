//! In-memory implementations of the repository and storage traits, shared by
//! the unit tests of the API modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::db::connection_repository::ConnectionRepository;
use crate::db::models::{
    Comment, ConnectionRequest, ConnectionStatus, Notification, Post, ProfileUpdate, User,
};
use crate::db::notification_repository::NotificationRepository;
use crate::db::post_repository::PostRepository;
use crate::db::user_repository::UserRepository;
use crate::error::AppError;
use crate::storage::client::StorageClient;

#[derive(Default)]
pub struct MemoryUsers {
    pub users: Mutex<Vec<User>>,
}

impl MemoryUsers {
    /// Insert a user with a dummy password hash and return it.
    pub fn seed(&self, username: &str) -> User {
        let user = User::new(
            username.to_uppercase(),
            username.to_string(),
            format!("{username}@example.com"),
            "not-a-hash".to_string(),
        );
        self.users.lock().unwrap().push(user.clone());
        user
    }

    pub fn get(&self, id: &str) -> User {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .expect("user should exist")
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn create(&self, user: User) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::BadRequest("Email already exists".into()));
        }
        if users.iter().any(|u| u.username == user.username) {
            return Err(AppError::BadRequest("Username already exists".into()));
        }
        users.push(user);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn record_profile_view(&self, username: &str) -> Result<Option<User>, AppError> {
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.username == username).map(|u| {
            u.profile_views += 1;
            u.clone()
        }))
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        let update = update.clone();
        if let Some(v) = update.name {
            user.name = v;
        }
        if let Some(v) = update.headline {
            user.headline = v;
        }
        if let Some(v) = update.about {
            user.about = v;
        }
        if let Some(v) = update.location {
            user.location = v;
        }
        if let Some(v) = update.profile_picture {
            user.profile_picture = v;
        }
        if let Some(v) = update.banner_img {
            user.banner_img = v;
        }
        if let Some(v) = update.skills {
            user.skills = v;
        }
        if let Some(v) = update.experience {
            user.experience = v;
        }
        if let Some(v) = update.education {
            user.education = v;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn list_excluding(&self, exclude: &[String], limit: i64) -> Result<Vec<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| !exclude.contains(&u.id))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn add_connection(&self, user_id: &str, other_id: &str) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            if !user.is_connected_to(other_id) {
                user.connections.push(other_id.to_string());
            }
        }
        Ok(())
    }

    async fn remove_connection(&self, user_id: &str, other_id: &str) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.connections.retain(|c| c != other_id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPosts {
    pub posts: Mutex<Vec<Post>>,
    /// Number of `find_by_id` / `find_by_ids` calls.
    pub lookups: AtomicUsize,
    /// When set, `create` fails with a database error.
    pub fail_create: AtomicBool,
}

impl MemoryPosts {
    fn update(&self, id: &str, f: impl FnOnce(&mut Post)) -> Option<Post> {
        let mut posts = self.posts.lock().unwrap();
        posts.iter_mut().find(|p| p.id == id).map(|p| {
            f(p);
            p.updated_at = Utc::now();
            p.clone()
        })
    }
}

#[async_trait]
impl PostRepository for MemoryPosts {
    async fn create(&self, post: Post) -> Result<(), AppError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::Database("insert failed".into()));
        }
        self.posts.lock().unwrap().push(post);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Post>, AppError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.posts.lock().unwrap().iter().find(|p| p.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Post>, AppError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>, AppError> {
        let mut posts = self.posts.lock().unwrap().clone();
        posts.sort_by(|a, b| b.id.cmp(&a.id));
        posts.truncate(limit as usize);
        Ok(posts)
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|p| p.id != id);
        Ok(posts.len() != before)
    }

    async fn add_comment(&self, id: &str, comment: &Comment) -> Result<Option<Post>, AppError> {
        Ok(self.update(id, |p| p.comments.push(comment.clone())))
    }

    async fn add_like(&self, id: &str, user_id: &str) -> Result<Option<Post>, AppError> {
        let already_liked = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.id == id && p.is_liked_by(user_id));
        if already_liked {
            return Ok(None);
        }
        Ok(self.update(id, |p| p.likes.push(user_id.to_string())))
    }

    async fn remove_like(&self, id: &str, user_id: &str) -> Result<Option<Post>, AppError> {
        Ok(self.update(id, |p| p.likes.retain(|l| l != user_id)))
    }
}

#[derive(Default)]
pub struct MemoryConnections {
    pub requests: Mutex<Vec<ConnectionRequest>>,
}

#[async_trait]
impl ConnectionRepository for MemoryConnections {
    async fn create(&self, request: ConnectionRequest) -> Result<(), AppError> {
        self.requests.lock().unwrap().push(request);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ConnectionRequest>, AppError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn find_pending(
        &self,
        sender: &str,
        recipient: &str,
    ) -> Result<Option<ConnectionRequest>, AppError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| {
                r.sender == sender
                    && r.recipient == recipient
                    && r.status == ConnectionStatus::Pending
            })
            .cloned())
    }

    async fn set_status(&self, id: &str, status: ConnectionStatus) -> Result<(), AppError> {
        let mut requests = self.requests.lock().unwrap();
        if let Some(r) = requests.iter_mut().find(|r| r.id == id) {
            r.status = status;
            r.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_pending_for(&self, recipient: &str) -> Result<Vec<ConnectionRequest>, AppError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.recipient == recipient && r.status == ConnectionStatus::Pending)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryNotifications {
    pub notifications: Mutex<Vec<Notification>>,
}

impl MemoryNotifications {
    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotifications {
    async fn create(&self, notification: Notification) -> Result<(), AppError> {
        self.notifications.lock().unwrap().push(notification);
        Ok(())
    }

    async fn list_for(&self, recipient: &str) -> Result<Vec<Notification>, AppError> {
        let mut list: Vec<Notification> = self
            .notifications
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(list)
    }

    async fn mark_read(
        &self,
        id: &str,
        recipient: &str,
    ) -> Result<Option<Notification>, AppError> {
        let mut list = self.notifications.lock().unwrap();
        Ok(list
            .iter_mut()
            .find(|n| n.id == id && n.recipient == recipient)
            .map(|n| {
                n.read = true;
                n.clone()
            }))
    }

    async fn mark_all_read(&self, recipient: &str) -> Result<u64, AppError> {
        let mut list = self.notifications.lock().unwrap();
        let mut changed = 0;
        for n in list.iter_mut().filter(|n| n.recipient == recipient && !n.read) {
            n.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, id: &str, recipient: &str) -> Result<bool, AppError> {
        let mut list = self.notifications.lock().unwrap();
        let before = list.len();
        list.retain(|n| !(n.id == id && n.recipient == recipient));
        Ok(list.len() != before)
    }

    async fn delete_for_post(&self, post_id: &str) -> Result<u64, AppError> {
        let mut list = self.notifications.lock().unwrap();
        let before = list.len();
        list.retain(|n| n.related_post.as_deref() != Some(post_id));
        Ok((before - list.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(
        &self,
        key: &str,
        content: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), AppError> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), content);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
