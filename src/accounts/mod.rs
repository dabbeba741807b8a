//! Account store adapter
//!
//! Typed reads and writes for the single account document per user.
//! Every engine mutation funnels through here; nothing else in the
//! crate issues ad-hoc field writes against accounts. Claim methods are
//! single conditional store operations, so check and write cannot be
//! split by a concurrent session.

pub mod ledger;

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use crate::db::schemas::{AccountDoc, Badge, ACCOUNT_COLLECTION};
use crate::db::{Condition, DocumentStore, Update};
use crate::types::{EngineError, Result};

pub use ledger::LedgerWriter;

/// Typed adapter over the `accounts` collection
#[derive(Clone)]
pub struct AccountStore {
    store: Arc<dyn DocumentStore>,
}

fn decode(value: Value) -> Result<AccountDoc> {
    serde_json::from_value(value)
        .map_err(|e| EngineError::Internal(format!("malformed account document: {}", e)))
}

impl AccountStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Fetch an account by id
    pub async fn load(&self, id: &str) -> Result<Option<AccountDoc>> {
        self.store
            .get_by_id(ACCOUNT_COLLECTION, id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Fetch an account by id, failing when absent
    pub async fn load_required(&self, id: &str) -> Result<AccountDoc> {
        self.load(id)
            .await?
            .ok_or_else(|| EngineError::AccountNotFound(id.to_string()))
    }

    /// Fetch an account by wallet address
    pub async fn find_by_wallet(&self, wallet: &str) -> Result<Option<AccountDoc>> {
        self.store
            .get_by_field(ACCOUNT_COLLECTION, "wallet_address", &json!(wallet))
            .await?
            .map(decode)
            .transpose()
    }

    /// Fetch an account by its referral code
    pub async fn find_by_referral_code(&self, code: &str) -> Result<Option<AccountDoc>> {
        self.store
            .get_by_field(ACCOUNT_COLLECTION, "referrals.referral_code", &json!(code))
            .await?
            .map(decode)
            .transpose()
    }

    /// Persist a new account document
    pub async fn create(&self, account: &AccountDoc) -> Result<()> {
        let value = serde_json::to_value(account)
            .map_err(|e| EngineError::Internal(format!("account serialization failed: {}", e)))?;

        let created = self
            .store
            .create_if_absent(ACCOUNT_COLLECTION, &account.id, value)
            .await?;
        if !created {
            return Err(EngineError::AccountExists(account.wallet_address.clone()));
        }

        debug!(account = %account.id, wallet = %account.wallet_address, "account created");
        Ok(())
    }

    /// Apply a partial update, stamping `metadata.updated_at`
    pub async fn apply(&self, id: &str, update: Update) -> Result<()> {
        let update = update.set("metadata.updated_at", json!(Utc::now()));
        self.store
            .partial_update(ACCOUNT_COLLECTION, id, update)
            .await
    }

    /// Apply a partial update only if every condition holds
    pub async fn apply_if(
        &self,
        id: &str,
        conditions: &[(String, Condition)],
        update: Update,
    ) -> Result<bool> {
        let update = update.set("metadata.updated_at", json!(Utc::now()));
        self.store
            .update_if(ACCOUNT_COLLECTION, id, conditions, update)
            .await
    }

    /// Atomically mark a demo completed, applying the reward update in
    /// the same operation. Returns false when another session already
    /// completed it - the caller then re-scores as a replay.
    pub async fn claim_first_completion(
        &self,
        id: &str,
        demo_slug: &str,
        update: Update,
    ) -> Result<bool> {
        let conditions = vec![(
            format!("demos.{demo_slug}.status"),
            Condition::Ne(json!("completed")),
        )];
        self.apply_if(id, &conditions, update).await
    }

    /// Atomically grant a badge unless one with the same name exists.
    /// The badge append and its point/experience grant land together.
    pub async fn claim_badge(&self, id: &str, badge: &Badge, new_level: i64) -> Result<bool> {
        let badge_value = serde_json::to_value(badge)
            .map_err(|e| EngineError::Internal(format!("badge serialization failed: {}", e)))?;

        let conditions = vec![(
            "badges.name".to_string(),
            Condition::Ne(json!(badge.name)),
        )];
        let update = Update::new()
            .push("badges", badge_value)
            .inc("profile.total_points", badge.points_value)
            .inc("profile.experience", badge.points_value)
            .set("profile.level", json!(new_level));

        self.apply_if(id, &conditions, update).await
    }

    /// Atomically record a quest completion unless already recorded
    pub async fn claim_quest(&self, id: &str, quest_id: &str, update: Update) -> Result<bool> {
        let conditions = vec![(
            "completed_quests".to_string(),
            Condition::Ne(json!(quest_id)),
        )];
        let update = update.push("completed_quests", json!(quest_id));
        self.apply_if(id, &conditions, update).await
    }

    /// Record the referrer wallet, only if none was ever recorded
    pub async fn set_referred_by_if_unset(&self, id: &str, referrer_wallet: &str) -> Result<bool> {
        let conditions = vec![(
            "referrals.referred_by".to_string(),
            Condition::Eq(Value::Null),
        )];
        let update = Update::new().set("referrals.referred_by", json!(referrer_wallet));
        self.apply_if(id, &conditions, update).await
    }

    /// Accounts ranked by total points, highest first
    pub async fn top_by_points(&self, limit: usize) -> Result<Vec<AccountDoc>> {
        let mut accounts: Vec<AccountDoc> = self
            .store
            .query(ACCOUNT_COLLECTION, &[])
            .await?
            .into_iter()
            .map(decode)
            .collect::<Result<_>>()?;

        accounts.sort_by(|a, b| b.profile.total_points.cmp(&a.profile.total_points));
        accounts.truncate(limit);
        Ok(accounts)
    }

    /// Every account, for reconciliation sweeps
    pub async fn all(&self) -> Result<Vec<AccountDoc>> {
        self.store
            .query(ACCOUNT_COLLECTION, &[])
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}
