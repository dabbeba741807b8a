//! Global demo completion counters
//!
//! Maintained best-effort alongside the per-account write: a failed
//! increment is logged and swallowed, and readers treat a missing
//! counter as zero.

use serde::{Deserialize, Serialize};

use crate::db::schemas::Metadata;

/// Collection name for demo stats
pub const DEMO_STATS_COLLECTION: &str = "demo_stats";

/// Completion counter for one demo
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DemoStatDoc {
    /// Canonical demo slug
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub completions: i64,

    #[serde(default)]
    pub metadata: Metadata,
}

impl DemoStatDoc {
    /// Zeroed counter for a demo
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            id: slug.into(),
            completions: 0,
            metadata: Metadata::new(),
        }
    }
}
