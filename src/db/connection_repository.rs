use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;

use crate::db::models::{ConnectionRequest, ConnectionStatus};
use crate::error::AppError;

/// Repository trait for connection requests.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn create(&self, request: ConnectionRequest) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<ConnectionRequest>, AppError>;

    /// The pending request sent by `sender` to `recipient`, if any.
    async fn find_pending(
        &self,
        sender: &str,
        recipient: &str,
    ) -> Result<Option<ConnectionRequest>, AppError>;

    /// Overwrite the status of a request.
    async fn set_status(&self, id: &str, status: ConnectionStatus) -> Result<(), AppError>;

    /// Pending requests addressed to `recipient`, newest first.
    async fn list_pending_for(&self, recipient: &str) -> Result<Vec<ConnectionRequest>, AppError>;
}

/// MongoDB implementation of the ConnectionRepository.
pub struct MongoConnectionRepository {
    collection: mongodb::Collection<ConnectionRequest>,
}

impl MongoConnectionRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("connectionrequests"),
        }
    }
}

#[async_trait]
impl ConnectionRepository for MongoConnectionRepository {
    async fn create(&self, request: ConnectionRequest) -> Result<(), AppError> {
        self.collection.insert_one(&request).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ConnectionRequest>, AppError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_pending(
        &self,
        sender: &str,
        recipient: &str,
    ) -> Result<Option<ConnectionRequest>, AppError> {
        Ok(self
            .collection
            .find_one(doc! {
                "sender": sender,
                "recipient": recipient,
                "status": ConnectionStatus::Pending.as_str(),
            })
            .await?)
    }

    async fn set_status(&self, id: &str, status: ConnectionStatus) -> Result<(), AppError> {
        self.collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "status": status.as_str(),
                    "updatedAt": bson::to_bson(&Utc::now())?,
                } },
            )
            .await?;
        Ok(())
    }

    async fn list_pending_for(&self, recipient: &str) -> Result<Vec<ConnectionRequest>, AppError> {
        use mongodb::options::FindOptions;

        let options = FindOptions::builder().sort(doc! { "_id": -1 }).build();

        let cursor = self
            .collection
            .find(doc! {
                "recipient": recipient,
                "status": ConnectionStatus::Pending.as_str(),
            })
            .with_options(options)
            .await?;

        Ok(cursor.try_collect().await?)
    }
}
