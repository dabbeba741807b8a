//! Reconciliation sweep
//!
//! Repairs drift left behind by the non-transactional write pattern:
//! voids overdue invitations, then backfills referral records for every
//! account with completed invitations missing from its history. Run
//! periodically by the reconciler worker.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::types::Result;

use super::ReferralEngine;

/// Counters from one reconciliation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    pub expired_invitations: usize,
    pub accounts_scanned: usize,
    pub referrals_backfilled: usize,
}

impl ReferralEngine {
    /// Run one full reconciliation pass over every account
    pub async fn reconcile_all(&self) -> Result<SweepSummary> {
        let mut summary = SweepSummary {
            expired_invitations: self.invitations.expire_overdue(Utc::now()).await?,
            ..Default::default()
        };

        for account in self.accounts.all().await? {
            summary.accounts_scanned += 1;

            // one failing account must not stop the sweep
            match self.check_for_new_referrals(&account.id).await {
                Ok(backfilled) => summary.referrals_backfilled += backfilled,
                Err(e) => {
                    warn!(account = %account.id, "reconciliation failed for account: {}", e);
                }
            }
        }

        info!(
            expired = summary.expired_invitations,
            scanned = summary.accounts_scanned,
            backfilled = summary.referrals_backfilled,
            "reconciliation sweep finished"
        );
        Ok(summary)
    }
}
