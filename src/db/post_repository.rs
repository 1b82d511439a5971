use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

use crate::db::models::{Comment, Post};
use crate::error::AppError;

/// Repository trait for posts and their embedded comments and likes.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: Post) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Post>, AppError>;

    /// Fetch every post whose id is in `ids`. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Post>, AppError>;

    /// The most recent posts, newest first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>, AppError>;

    /// Delete a post. Returns `false` if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    /// Append a comment and return the updated post.
    async fn add_comment(&self, id: &str, comment: &Comment) -> Result<Option<Post>, AppError>;

    /// Add `user_id` to the likes and return the updated post.
    ///
    /// Returns `None` when the post does not exist or `user_id` already likes it,
    /// so only one of several concurrent likes by the same user reports a change.
    async fn add_like(&self, id: &str, user_id: &str) -> Result<Option<Post>, AppError>;

    /// Remove `user_id` from the likes and return the updated post.
    async fn remove_like(&self, id: &str, user_id: &str) -> Result<Option<Post>, AppError>;
}

/// MongoDB implementation of the PostRepository.
pub struct MongoPostRepository {
    collection: mongodb::Collection<Post>,
}

impl MongoPostRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("posts"),
        }
    }

    async fn update_returning(
        &self,
        filter: mongodb::bson::Document,
        update: mongodb::bson::Document,
    ) -> Result<Option<Post>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .collection
            .find_one_and_update(filter, update)
            .with_options(options)
            .await?)
    }
}

#[async_trait]
impl PostRepository for MongoPostRepository {
    async fn create(&self, post: Post) -> Result<(), AppError> {
        self.collection.insert_one(&post).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Post>, AppError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Post>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cursor = self.collection.find(doc! { "_id": { "$in": ids } }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>, AppError> {
        use mongodb::options::FindOptions;

        // Ids are UUID v7, so `_id` order is creation order.
        let options = FindOptions::builder()
            .sort(doc! { "_id": -1 })
            .limit(limit)
            .build();

        let cursor = self.collection.find(doc! {}).with_options(options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn add_comment(&self, id: &str, comment: &Comment) -> Result<Option<Post>, AppError> {
        let update = doc! {
            "$push": { "comments": bson::to_bson(comment)? },
            "$set": { "updatedAt": bson::to_bson(&Utc::now())? },
        };
        self.update_returning(doc! { "_id": id }, update).await
    }

    async fn add_like(&self, id: &str, user_id: &str) -> Result<Option<Post>, AppError> {
        let update = doc! {
            "$push": { "likes": user_id },
            "$set": { "updatedAt": bson::to_bson(&Utc::now())? },
        };
        self.update_returning(doc! { "_id": id, "likes": { "$ne": user_id } }, update)
            .await
    }

    async fn remove_like(&self, id: &str, user_id: &str) -> Result<Option<Post>, AppError> {
        let update = doc! {
            "$pull": { "likes": user_id },
            "$set": { "updatedAt": bson::to_bson(&Utc::now())? },
        };
        self.update_returning(doc! { "_id": id }, update).await
    }
}
