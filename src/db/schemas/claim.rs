//! Completion claim document schema
//!
//! Server-side idempotency record for demo completions. The claim is
//! inserted with create-if-absent before the reward write sequence, so
//! two sessions (or a retry after an ambiguous failure) cannot both own
//! the same (account, demo, attempt) completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::schemas::Metadata;

/// Collection name for completion claims
pub const CLAIM_COLLECTION: &str = "completion_claims";

/// One claimed completion attempt
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CompletionClaimDoc {
    /// `{account_id}:{demo_slug}:{attempt}`
    #[serde(rename = "_id")]
    pub id: String,

    pub account_id: String,
    pub demo_id: String,
    pub attempt: i64,
    pub claimed_at: DateTime<Utc>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl CompletionClaimDoc {
    /// Claim key for a completion attempt
    pub fn key(account_id: &str, demo_slug: &str, attempt: i64) -> String {
        format!("{account_id}:{demo_slug}:{attempt}")
    }

    /// Create a claim stamped with the current time
    pub fn new(account_id: impl Into<String>, demo_slug: impl Into<String>, attempt: i64) -> Self {
        let account_id = account_id.into();
        let demo_id = demo_slug.into();
        Self {
            id: Self::key(&account_id, &demo_id, attempt),
            account_id,
            demo_id,
            attempt,
            claimed_at: Utc::now(),
            metadata: Metadata::new(),
        }
    }
}
