use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;

use crate::db::models::Notification;
use crate::error::AppError;

/// Repository trait for notifications.
///
/// Every per-notification operation is scoped to its recipient so a user can
/// never read or modify someone else's notifications.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: Notification) -> Result<(), AppError>;

    /// Notifications of `recipient`, newest first.
    async fn list_for(&self, recipient: &str) -> Result<Vec<Notification>, AppError>;

    /// Mark one notification read and return it.
    async fn mark_read(&self, id: &str, recipient: &str)
        -> Result<Option<Notification>, AppError>;

    /// Mark all unread notifications of `recipient` read. Returns how many changed.
    async fn mark_all_read(&self, recipient: &str) -> Result<u64, AppError>;

    /// Delete one notification. Returns `false` if nothing matched.
    async fn delete(&self, id: &str, recipient: &str) -> Result<bool, AppError>;

    /// Delete every notification that references `post_id`.
    async fn delete_for_post(&self, post_id: &str) -> Result<u64, AppError>;
}

/// MongoDB implementation of the NotificationRepository.
pub struct MongoNotificationRepository {
    collection: mongodb::Collection<Notification>,
}

impl MongoNotificationRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("notifications"),
        }
    }
}

#[async_trait]
impl NotificationRepository for MongoNotificationRepository {
    async fn create(&self, notification: Notification) -> Result<(), AppError> {
        self.collection.insert_one(&notification).await?;
        Ok(())
    }

    async fn list_for(&self, recipient: &str) -> Result<Vec<Notification>, AppError> {
        use mongodb::options::FindOptions;

        let options = FindOptions::builder().sort(doc! { "_id": -1 }).build();

        let cursor = self
            .collection
            .find(doc! { "recipient": recipient })
            .with_options(options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn mark_read(
        &self,
        id: &str,
        recipient: &str,
    ) -> Result<Option<Notification>, AppError> {
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .collection
            .find_one_and_update(
                doc! { "_id": id, "recipient": recipient },
                doc! { "$set": { "read": true, "updatedAt": bson::to_bson(&Utc::now())? } },
            )
            .with_options(options)
            .await?)
    }

    async fn mark_all_read(&self, recipient: &str) -> Result<u64, AppError> {
        let result = self
            .collection
            .update_many(
                doc! { "recipient": recipient, "read": false },
                doc! { "$set": { "read": true, "updatedAt": bson::to_bson(&Utc::now())? } },
            )
            .await?;
        Ok(result.modified_count)
    }

    async fn delete(&self, id: &str, recipient: &str) -> Result<bool, AppError> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id, "recipient": recipient })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_for_post(&self, post_id: &str) -> Result<u64, AppError> {
        let result = self
            .collection
            .delete_many(doc! { "relatedPost": post_id })
            .await?;
        Ok(result.deleted_count)
    }
}
