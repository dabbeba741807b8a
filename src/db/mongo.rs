//! MongoDB implementation of the document store contract
//!
//! Field operations translate onto `$set` / `$inc` / `$push`, conditional
//! updates onto filtered `update_one` calls, so every partial update and
//! claim is a single atomic operation on one document.

use bson::{doc, Bson, Document};
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use serde_json::Value;
use tracing::info;

use async_trait::async_trait;

use super::store::{Condition, DocumentStore, FieldOp, Update};
use crate::db::schemas::{
    ACCOUNT_COLLECTION, INVITATION_COLLECTION, LEDGER_COLLECTION,
};
use crate::types::{EngineError, Result};

/// MongoDB-backed document store
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db_name: String,
}

impl MongoStore {
    /// Connect, verify with a ping, and apply collection indexes
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| EngineError::StoreUnavailable(format!("Failed to connect: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| EngineError::StoreUnavailable(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        let store = Self {
            client,
            db_name: db_name.to_string(),
        };
        store.apply_indexes().await?;

        Ok(store)
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.client.database(&self.db_name).collection(name)
    }

    /// Apply the indexes each collection relies on
    async fn apply_indexes(&self) -> Result<()> {
        let account_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "wallet_address": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("wallet_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "referrals.referral_code": 1 })
                .options(
                    IndexOptions::builder()
                        .name("referral_code_index".to_string())
                        .build(),
                )
                .build(),
        ];

        let ledger_indexes = vec![IndexModel::builder()
            .keys(doc! { "account_id": 1, "timestamp": -1 })
            .options(
                IndexOptions::builder()
                    .name("account_timestamp_index".to_string())
                    .build(),
            )
            .build()];

        let invitation_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "email": 1, "status": 1 })
                .options(
                    IndexOptions::builder()
                        .name("email_status_index".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "referrer_wallet": 1 })
                .options(
                    IndexOptions::builder()
                        .name("referrer_index".to_string())
                        .build(),
                )
                .build(),
        ];

        for (name, indexes) in [
            (ACCOUNT_COLLECTION, account_indexes),
            (LEDGER_COLLECTION, ledger_indexes),
            (INVITATION_COLLECTION, invitation_indexes),
        ] {
            self.collection(name)
                .create_indexes(indexes)
                .await
                .map_err(|e| {
                    EngineError::Database(format!("Failed to create indexes on {}: {}", name, e))
                })?;
        }

        Ok(())
    }
}

fn to_document(value: &Value) -> Result<Document> {
    bson::to_document(value)
        .map_err(|e| EngineError::Database(format!("Document conversion failed: {}", e)))
}

fn to_value(document: Document) -> Result<Value> {
    serde_json::to_value(&document)
        .map_err(|e| EngineError::Database(format!("Document conversion failed: {}", e)))
}

fn to_bson(value: &Value) -> Result<Bson> {
    bson::to_bson(value)
        .map_err(|e| EngineError::Database(format!("Value conversion failed: {}", e)))
}

/// Translate an [`Update`] into a MongoDB update document
fn to_update_document(update: &Update) -> Result<Document> {
    let mut set = Document::new();
    let mut inc = Document::new();
    let mut push = Document::new();

    for (path, op) in update.ops() {
        match op {
            FieldOp::Set(value) => {
                set.insert(path, to_bson(value)?);
            }
            FieldOp::Increment(amount) => {
                inc.insert(path, *amount);
            }
            FieldOp::AppendToArray(value) => {
                push.insert(path, to_bson(value)?);
            }
        }
    }

    let mut modifications = Document::new();
    if !set.is_empty() {
        modifications.insert("$set", set);
    }
    if !inc.is_empty() {
        modifications.insert("$inc", inc);
    }
    if !push.is_empty() {
        modifications.insert("$push", push);
    }

    Ok(modifications)
}

/// Translate conditions into filter fields
fn to_filter(conditions: &[(String, Condition)]) -> Result<Document> {
    let mut filter = Document::new();
    for (path, condition) in conditions {
        match condition {
            Condition::Eq(value) => {
                filter.insert(path, to_bson(value)?);
            }
            Condition::Ne(value) => {
                filter.insert(path, doc! { "$ne": to_bson(value)? });
            }
        }
    }
    Ok(filter)
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let found = self
            .collection(collection)
            .find_one(doc! { "_id": id, "metadata.is_deleted": { "$ne": true } })
            .await
            .map_err(|e| EngineError::Database(format!("Find failed: {}", e)))?;

        found.map(to_value).transpose()
    }

    async fn get_by_field(
        &self,
        collection: &str,
        path: &str,
        value: &Value,
    ) -> Result<Option<Value>> {
        let mut filter = doc! { "metadata.is_deleted": { "$ne": true } };
        filter.insert(path, to_bson(value)?);

        let found = self
            .collection(collection)
            .find_one(filter)
            .await
            .map_err(|e| EngineError::Database(format!("Find failed: {}", e)))?;

        found.map(to_value).transpose()
    }

    async fn create_or_replace(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        let mut doc = to_document(&document)?;
        doc.insert("_id", id);

        self.collection(collection)
            .replace_one(doc! { "_id": id }, doc)
            .upsert(true)
            .await
            .map_err(|e| EngineError::Database(format!("Replace failed: {}", e)))?;

        Ok(())
    }

    async fn create_if_absent(&self, collection: &str, id: &str, document: Value) -> Result<bool> {
        let mut doc = to_document(&document)?;
        doc.insert("_id", id);

        match self.collection(collection).insert_one(doc).await {
            Ok(_) => Ok(true),
            Err(e) => match *e.kind {
                // duplicate key: the id is already claimed
                ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == 11000 => {
                    Ok(false)
                }
                _ => Err(EngineError::Database(format!("Insert failed: {}", e))),
            },
        }
    }

    async fn partial_update(&self, collection: &str, id: &str, update: Update) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }

        self.collection(collection)
            .update_one(doc! { "_id": id }, to_update_document(&update)?)
            .await
            .map_err(|e| EngineError::Database(format!("Update failed: {}", e)))?;

        Ok(())
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        conditions: &[(String, Condition)],
        update: Update,
    ) -> Result<bool> {
        let mut filter = to_filter(conditions)?;
        filter.insert("_id", id);
        filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let result = self
            .collection(collection)
            .update_one(filter, to_update_document(&update)?)
            .await
            .map_err(|e| EngineError::Database(format!("Update failed: {}", e)))?;

        Ok(result.matched_count > 0)
    }

    async fn query(
        &self,
        collection: &str,
        filter: &[(String, Condition)],
    ) -> Result<Vec<Value>> {
        use futures_util::StreamExt;

        let mut full_filter = to_filter(filter)?;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let mut cursor = self
            .collection(collection)
            .find(full_filter)
            .await
            .map_err(|e| EngineError::Database(format!("Find failed: {}", e)))?;

        let mut results = Vec::new();
        while let Some(item) = cursor.next().await {
            let doc = item.map_err(|e| EngineError::Database(format!("Cursor failed: {}", e)))?;
            results.push(to_value(doc)?);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_translation_groups_operators() {
        let update = Update::new()
            .set("profile.level", json!(2))
            .inc("profile.total_points", 80)
            .push("badges", json!({ "name": "First Steps" }));

        let doc = to_update_document(&update).unwrap();
        assert!(doc.get_document("$set").unwrap().contains_key("profile.level"));
        assert_eq!(
            doc.get_document("$inc")
                .unwrap()
                .get_i64("profile.total_points")
                .unwrap(),
            80
        );
        assert!(doc.get_document("$push").unwrap().contains_key("badges"));
    }

    #[test]
    fn test_condition_translation() {
        let filter = to_filter(&[
            ("badges.name".to_string(), Condition::Ne(json!("Closer"))),
            ("status".to_string(), Condition::Eq(json!("sent"))),
        ])
        .unwrap();

        assert_eq!(
            filter.get_document("badges.name").unwrap().get_str("$ne").unwrap(),
            "Closer"
        );
        assert_eq!(filter.get_str("status").unwrap(), "sent");
    }
}
