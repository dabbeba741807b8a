//! Ledger writer
//!
//! Appends immutable point-transaction rows. Every reward grant in the
//! crate writes exactly one row here; the ledger is the audit trail the
//! balance is reconciled against.

use std::sync::Arc;

use tracing::debug;

use crate::db::schemas::{PointsTransactionDoc, TxType, LEDGER_COLLECTION};
use crate::db::{Condition, DocumentStore};
use crate::types::{EngineError, Result};

/// Append-only adapter over the `points_transactions` collection
#[derive(Clone)]
pub struct LedgerWriter {
    store: Arc<dyn DocumentStore>,
}

impl LedgerWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Append one immutable ledger row
    pub async fn append(
        &self,
        account_id: &str,
        tx_type: TxType,
        amount: i64,
        reason: impl Into<String>,
        demo_id: Option<String>,
    ) -> Result<()> {
        let row = PointsTransactionDoc::new(account_id, tx_type, amount, reason, demo_id);
        let value = serde_json::to_value(&row)
            .map_err(|e| EngineError::Internal(format!("ledger serialization failed: {}", e)))?;

        self.store
            .create_or_replace(LEDGER_COLLECTION, &row.id, value)
            .await?;

        debug!(account = %account_id, amount, reason = %row.reason, "ledger row appended");
        Ok(())
    }

    /// Every ledger row for an account, oldest first
    pub async fn entries_for(&self, account_id: &str) -> Result<Vec<PointsTransactionDoc>> {
        let mut rows: Vec<PointsTransactionDoc> = self
            .store
            .query(
                LEDGER_COLLECTION,
                &[(
                    "account_id".to_string(),
                    Condition::Eq(serde_json::json!(account_id)),
                )],
            )
            .await?
            .into_iter()
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    EngineError::Internal(format!("malformed ledger document: {}", e))
                })
            })
            .collect::<Result<_>>()?;

        rows.sort_by_key(|row| row.timestamp);
        Ok(rows)
    }
}
