use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;

use crate::db::models::{ProfileUpdate, User};
use crate::error::AppError;

/// Repository trait for user accounts.
///
/// This trait allows mocking the database layer in tests.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    async fn create(&self, user: User) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Fetch every user whose id is in `ids`. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError>;

    /// Atomically increment the profile view counter and return the updated user.
    async fn record_profile_view(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Apply a partial profile update and return the updated user.
    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AppError>;

    /// Users not in `exclude`, at most `limit` of them.
    async fn list_excluding(&self, exclude: &[String], limit: i64) -> Result<Vec<User>, AppError>;

    /// Add `other_id` to the connections of `user_id` (set semantics).
    async fn add_connection(&self, user_id: &str, other_id: &str) -> Result<(), AppError>;

    /// Remove `other_id` from the connections of `user_id`.
    async fn remove_connection(&self, user_id: &str, other_id: &str) -> Result<(), AppError>;
}

/// MongoDB implementation of the UserRepository.
pub struct MongoUserRepository {
    collection: mongodb::Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("users"),
        }
    }

    /// Create the unique indexes on `email` and `username`.
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        for field in ["email", "username"] {
            let mut keys = mongodb::bson::Document::new();
            keys.insert(field, 1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.collection.create_index(index).await?;
        }

        Ok(())
    }
}

/// MongoDB error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Client-facing message for an insert rejected by one of the unique indexes.
fn duplicate_key_message(err: &mongodb::error::Error) -> Option<&'static str> {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE => {
            Some(duplicate_field_message(&write.message))
        }
        _ => None,
    }
}

/// Maps the server's duplicate-key text (`... index: username_1 dup key ...`) to the
/// field that collided. Email is the first index checked at signup.
fn duplicate_field_message(server_message: &str) -> &'static str {
    if server_message.contains("username_1") {
        "Username already exists"
    } else {
        "Email already exists"
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create(&self, user: User) -> Result<(), AppError> {
        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(()),
            Err(e) => match duplicate_key_message(&e) {
                Some(message) => Err(AppError::BadRequest(message.into())),
                None => Err(e.into()),
            },
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.collection.find_one(doc! { "username": username }).await?)
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cursor = self.collection.find(doc! { "_id": { "$in": ids } }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn record_profile_view(&self, username: &str) -> Result<Option<User>, AppError> {
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .collection
            .find_one_and_update(
                doc! { "username": username },
                doc! { "$inc": { "profileViews": 1 } },
            )
            .with_options(options)
            .await?)
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AppError> {
        use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

        // Absent fields are skipped during serialization, so only provided
        // fields end up in `$set`.
        let mut set = bson::to_document(update)?;
        set.insert("updatedAt", bson::to_bson(&Utc::now())?);

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .with_options(options)
            .await?)
    }

    async fn list_excluding(&self, exclude: &[String], limit: i64) -> Result<Vec<User>, AppError> {
        use mongodb::options::FindOptions;

        let options = FindOptions::builder().limit(limit).build();

        let cursor = self
            .collection
            .find(doc! { "_id": { "$nin": exclude } })
            .with_options(options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn add_connection(&self, user_id: &str, other_id: &str) -> Result<(), AppError> {
        self.collection
            .update_one(
                doc! { "_id": user_id },
                doc! { "$addToSet": { "connections": other_id } },
            )
            .await?;
        Ok(())
    }

    async fn remove_connection(&self, user_id: &str, other_id: &str) -> Result<(), AppError> {
        self.collection
            .update_one(
                doc! { "_id": user_id },
                doc! { "$pull": { "connections": other_id } },
            )
            .await?;
        Ok(())
    }
}
