//! Points ledger document schema
//!
//! One immutable row per balance change. Write-once, read-many; rows are
//! never updated or deleted, making the ledger the audit trail for every
//! reward grant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::schemas::Metadata;

/// Collection name for points transactions
pub const LEDGER_COLLECTION: &str = "points_transactions";

/// Kind of balance change
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Earn,
    Spend,
    Bonus,
    Penalty,
}

/// Immutable points-transaction row
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PointsTransactionDoc {
    /// Document id (random)
    #[serde(rename = "_id")]
    pub id: String,

    /// Account this row belongs to
    pub account_id: String,

    /// Kind of balance change
    pub tx_type: TxType,

    /// Signed point amount (spend/penalty rows carry negative amounts)
    pub amount: i64,

    /// Human-readable explanation of the change
    pub reason: String,

    /// Demo that triggered the change, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_id: Option<String>,

    /// When the change happened
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl PointsTransactionDoc {
    /// Create a new ledger row stamped with the current time
    pub fn new(
        account_id: impl Into<String>,
        tx_type: TxType,
        amount: i64,
        reason: impl Into<String>,
        demo_id: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            tx_type,
            amount,
            reason: reason.into(),
            demo_id,
            timestamp: Utc::now(),
            metadata: Metadata::new(),
        }
    }
}
