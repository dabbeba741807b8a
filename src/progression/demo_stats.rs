//! Global demo completion counters
//!
//! Thin adapter over the `demo_stats` collection. Callers treat the
//! increment as best-effort; a missing counter reads as zero.

use std::sync::Arc;

use serde_json::to_value;

use crate::db::schemas::{DemoStatDoc, DEMO_STATS_COLLECTION};
use crate::db::{DocumentStore, Update};
use crate::types::{EngineError, Result};

#[derive(Clone)]
pub struct DemoStatsStore {
    store: Arc<dyn DocumentStore>,
}

impl DemoStatsStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Increment the global completion counter for a demo and return
    /// the completion-time value (0 when it cannot be read back)
    pub async fn increment_completions(&self, demo_slug: &str) -> Result<i64> {
        let seed = to_value(DemoStatDoc::new(demo_slug))
            .map_err(|e| EngineError::Internal(format!("stat serialization failed: {}", e)))?;

        self.store
            .create_if_absent(DEMO_STATS_COLLECTION, demo_slug, seed)
            .await?;
        self.store
            .partial_update(
                DEMO_STATS_COLLECTION,
                demo_slug,
                Update::new().inc("completions", 1),
            )
            .await?;

        let completions = self
            .store
            .get_by_id(DEMO_STATS_COLLECTION, demo_slug)
            .await?
            .and_then(|doc| doc.get("completions").and_then(|v| v.as_i64()))
            .unwrap_or(0);

        Ok(completions)
    }
}
