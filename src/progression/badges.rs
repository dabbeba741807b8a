//! Badge evaluation
//!
//! Runs after a first completion: re-reads the account to see the
//! just-written demo state, then grants the per-demo badge and, when the
//! full walkthrough is done, the composite Escrow Master badge. Grants
//! go through the atomic name-keyed claim on the account store, so a
//! concurrent evaluation cannot append a duplicate name.

use tracing::info;

use crate::accounts::{AccountStore, LedgerWriter};
use crate::catalog::{self, level_for_experience, BadgeSpec, DemoId};
use crate::db::schemas::{AccountDoc, Badge, TxType};
use crate::types::Result;

#[derive(Clone)]
pub struct BadgeEvaluator {
    accounts: AccountStore,
    ledger: LedgerWriter,
}

impl BadgeEvaluator {
    pub fn new(accounts: AccountStore, ledger: LedgerWriter) -> Self {
        Self { accounts, ledger }
    }

    /// Evaluate badges after the first completion of `demo`
    pub async fn after_completion(&self, account_id: &str, demo: DemoId) -> Result<Vec<Badge>> {
        // Re-read so the evaluation sees the completion that was just
        // persisted
        let Some(account) = self.accounts.load(account_id).await? else {
            return Ok(Vec::new());
        };

        let mut granted = Vec::new();

        let spec = catalog::demo_badge(demo);
        if let Some(badge) = self
            .grant(&account, spec, Some(demo.slug().to_string()))
            .await?
        {
            granted.push(badge);
        }

        // Composite badge: all required demos completed, in any order
        let walkthrough_done = catalog::ESCROW_MASTER_DEMOS
            .iter()
            .all(|d| account.demo_completed(*d));
        if walkthrough_done {
            if let Some(badge) = self.grant(&account, &catalog::ESCROW_MASTER, None).await? {
                granted.push(badge);
            }
        }

        Ok(granted)
    }

    /// Grant a badge unless one with the same name exists. The claim is
    /// authoritative; the in-memory pre-check just skips the write.
    pub async fn grant(
        &self,
        account: &AccountDoc,
        spec: &BadgeSpec,
        demo_id: Option<String>,
    ) -> Result<Option<Badge>> {
        if account.has_badge_named(spec.name) {
            return Ok(None);
        }

        let badge = Badge::from_spec(spec, demo_id);
        let new_level = level_for_experience(account.profile.experience + spec.points);
        if !self.accounts.claim_badge(&account.id, &badge, new_level).await? {
            return Ok(None);
        }

        self.ledger
            .append(
                &account.id,
                TxType::Earn,
                spec.points,
                format!("Badge: {}", spec.name),
                badge.demo_id.clone(),
            )
            .await?;

        info!(account = %account.id, badge = %spec.name, points = spec.points, "badge granted");
        Ok(Some(badge))
    }
}
