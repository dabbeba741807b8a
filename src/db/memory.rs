//! In-memory document store
//!
//! Backs the test suite and dev mode. Implements the same dotted-path
//! and condition semantics the MongoDB translation produces, so engine
//! behavior observed here carries over to the real store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::store::{Condition, DocumentStore, FieldOp, Update};
use crate::types::{EngineError, Result};

/// Process-local store: collection name -> (document id -> document)
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection (test helper)
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }
}

/// Resolve a dotted path against a document, flattening across arrays
/// the way document databases do: `badges.name` yields the `name` of
/// every element of the `badges` array.
fn resolve<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![doc];

    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(v) = map.get(segment) {
                        next.push(v);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Some(v) = item.get(segment) {
                            next.push(v);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }

    current
}

/// Document-database equality: a value matches when it equals the
/// expected value, or when it is an array containing it
fn value_matches(value: &Value, expected: &Value) -> bool {
    if value == expected {
        return true;
    }
    value
        .as_array()
        .map(|items| items.iter().any(|item| item == expected))
        .unwrap_or(false)
}

/// Evaluate one condition against a document
fn matches(doc: &Value, path: &str, condition: &Condition) -> bool {
    let values = resolve(doc, path);
    match condition {
        Condition::Eq(expected) => values.iter().any(|v| value_matches(v, expected)),
        // `Ne` matches when no resolved value equals, including when the
        // path is absent entirely
        Condition::Ne(expected) => !values.iter().any(|v| value_matches(v, expected)),
    }
}

fn matches_all(doc: &Value, conditions: &[(String, Condition)]) -> bool {
    conditions.iter().all(|(path, c)| matches(doc, path, c))
}

fn is_deleted(doc: &Value) -> bool {
    matches(doc, "metadata.is_deleted", &Condition::Eq(json!(true)))
}

/// Navigate to the slot at `path`, creating intermediate objects
fn slot<'a>(doc: &'a mut Value, path: &str) -> &'a mut Value {
    let mut current = doc;
    for segment in path.split('.') {
        if !current.is_object() {
            *current = json!({});
        }
        current = current
            .as_object_mut()
            .expect("slot parent is an object")
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    current
}

fn apply_op(doc: &mut Value, path: &str, op: &FieldOp) -> Result<()> {
    let target = slot(doc, path);
    match op {
        FieldOp::Set(value) => {
            *target = value.clone();
        }
        FieldOp::Increment(amount) => {
            let current = target.as_i64().unwrap_or(0);
            *target = json!(current + amount);
        }
        FieldOp::AppendToArray(value) => {
            if target.is_null() {
                *target = json!([]);
            }
            match target.as_array_mut() {
                Some(items) => items.push(value.clone()),
                None => {
                    return Err(EngineError::Internal(format!(
                        "append target '{path}' is not an array"
                    )))
                }
            }
        }
    }
    Ok(())
}

fn apply_update(doc: &mut Value, update: &Update) -> Result<()> {
    for (path, op) in update.ops() {
        apply_op(doc, path, op)?;
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id))
            .filter(|doc| !is_deleted(doc))
            .cloned())
    }

    async fn get_by_field(
        &self,
        collection: &str,
        path: &str,
        value: &Value,
    ) -> Result<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|c| {
            c.values()
                .find(|doc| {
                    !is_deleted(doc) && matches(doc, path, &Condition::Eq(value.clone()))
                })
                .cloned()
        }))
    }

    async fn create_or_replace(&self, collection: &str, id: &str, document: Value) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn create_if_absent(&self, collection: &str, id: &str, document: Value) -> Result<bool> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return Ok(false);
        }
        docs.insert(id.to_string(), document);
        Ok(true)
    }

    async fn partial_update(&self, collection: &str, id: &str, update: Update) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(doc) = collections.get_mut(collection).and_then(|c| c.get_mut(id)) {
            apply_update(doc, &update)?;
        }
        Ok(())
    }

    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        conditions: &[(String, Condition)],
        update: Update,
    ) -> Result<bool> {
        // Held for the whole check-then-write, so the conditional update
        // is atomic from the callers' perspective
        let mut collections = self.collections.write().await;
        let Some(doc) = collections.get_mut(collection).and_then(|c| c.get_mut(id)) else {
            return Ok(false);
        };

        if is_deleted(doc) || !matches_all(doc, conditions) {
            return Ok(false);
        }

        apply_update(doc, &update)?;
        Ok(true)
    }

    async fn query(
        &self,
        collection: &str,
        filter: &[(String, Condition)],
    ) -> Result<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| {
                c.values()
                    .filter(|doc| !is_deleted(doc) && matches_all(doc, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_increment_paths() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store
                .create_or_replace("accounts", "a1", json!({ "profile": { "total_points": 10 } }))
                .await
                .unwrap();

            let update = Update::new()
                .set("profile.level", json!(2))
                .inc("profile.total_points", 15)
                .inc("stats.total_demos_completed", 1);
            store.partial_update("accounts", "a1", update).await.unwrap();

            let doc = store.get_by_id("accounts", "a1").await.unwrap().unwrap();
            assert_eq!(doc["profile"]["level"], json!(2));
            assert_eq!(doc["profile"]["total_points"], json!(25));
            // increment on a missing path starts from zero
            assert_eq!(doc["stats"]["total_demos_completed"], json!(1));
        });
    }

    #[test]
    fn test_ne_condition_flattens_arrays() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store
                .create_or_replace(
                    "accounts",
                    "a1",
                    json!({ "badges": [{ "name": "First Steps" }] }),
                )
                .await
                .unwrap();

            let claim = |name: &str| {
                vec![(
                    "badges.name".to_string(),
                    Condition::Ne(json!(name)),
                )]
            };

            // a second grant of the same name is refused
            let granted = store
                .update_if(
                    "accounts",
                    "a1",
                    &claim("First Steps"),
                    Update::new().push("badges", json!({ "name": "First Steps" })),
                )
                .await
                .unwrap();
            assert!(!granted);

            // a distinct name lands
            let granted = store
                .update_if(
                    "accounts",
                    "a1",
                    &claim("Dealmaker"),
                    Update::new().push("badges", json!({ "name": "Dealmaker" })),
                )
                .await
                .unwrap();
            assert!(granted);

            let doc = store.get_by_id("accounts", "a1").await.unwrap().unwrap();
            assert_eq!(doc["badges"].as_array().unwrap().len(), 2);
        });
    }

    #[test]
    fn test_ne_on_plain_string_array() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store
                .create_or_replace("accounts", "a1", json!({ "completed_quests": ["refer-1-friend"] }))
                .await
                .unwrap();

            let taken = store
                .update_if(
                    "accounts",
                    "a1",
                    &[(
                        "completed_quests".to_string(),
                        Condition::Ne(json!("refer-1-friend")),
                    )],
                    Update::new().push("completed_quests", json!("refer-1-friend")),
                )
                .await
                .unwrap();
            assert!(!taken, "array containment must block the claim");

            let fresh = store
                .update_if(
                    "accounts",
                    "a1",
                    &[(
                        "completed_quests".to_string(),
                        Condition::Ne(json!("refer-5-friends")),
                    )],
                    Update::new().push("completed_quests", json!("refer-5-friends")),
                )
                .await
                .unwrap();
            assert!(fresh);
        });
    }

    #[test]
    fn test_create_if_absent_claims_once() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let first = store
                .create_if_absent("completion_claims", "a1:hello-escrow:1", json!({}))
                .await
                .unwrap();
            let second = store
                .create_if_absent("completion_claims", "a1:hello-escrow:1", json!({}))
                .await
                .unwrap();
            assert!(first);
            assert!(!second);
        });
    }

    #[test]
    fn test_query_with_filter() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store
                .create_or_replace("invitations", "i1", json!({ "status": "sent" }))
                .await
                .unwrap();
            store
                .create_or_replace("invitations", "i2", json!({ "status": "completed" }))
                .await
                .unwrap();

            let sent = store
                .query(
                    "invitations",
                    &[("status".to_string(), Condition::Eq(json!("sent")))],
                )
                .await
                .unwrap();
            assert_eq!(sent.len(), 1);

            let all = store.query("invitations", &[]).await.unwrap();
            assert_eq!(all.len(), 2);
        });
    }
}
