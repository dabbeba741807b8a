//! Quest evaluation
//!
//! Referral-threshold quests are granted by the referral cascade; social
//! quests arrive through the engine's public entry point. A grant adds
//! the quest id (atomic claim), the quest's point reward, and its badge,
//! then the Quest Master meta badge is re-checked against the full
//! master list.

use serde::Serialize;
use tracing::info;

use crate::accounts::{AccountStore, LedgerWriter};
use crate::catalog::{self, level_for_experience, QuestKind, QuestSpec};
use crate::db::schemas::{AccountDoc, Badge, TxType};
use crate::db::Update;
use crate::progression::BadgeEvaluator;
use crate::types::Result;

use serde_json::json;

/// One granted quest
#[derive(Debug, Clone, Serialize)]
pub struct QuestGrant {
    pub quest_id: String,
    pub points_awarded: i64,
    pub badge: Option<Badge>,
}

#[derive(Clone)]
pub(crate) struct QuestEvaluator {
    accounts: AccountStore,
    ledger: LedgerWriter,
    badges: BadgeEvaluator,
}

impl QuestEvaluator {
    pub fn new(accounts: AccountStore, ledger: LedgerWriter, badges: BadgeEvaluator) -> Self {
        Self {
            accounts,
            ledger,
            badges,
        }
    }

    /// Grant a quest unless already completed
    pub async fn grant(
        &self,
        account: &AccountDoc,
        spec: &QuestSpec,
    ) -> Result<Option<QuestGrant>> {
        if account.has_completed_quest(spec.id) {
            return Ok(None);
        }

        let xp_after = account.profile.experience + spec.points;
        let update = Update::new()
            .inc("profile.total_points", spec.points)
            .inc("profile.experience", spec.points)
            .set("profile.level", json!(level_for_experience(xp_after)));

        if !self.accounts.claim_quest(&account.id, spec.id, update).await? {
            return Ok(None);
        }

        self.ledger
            .append(
                &account.id,
                TxType::Earn,
                spec.points,
                format!("Quest completed: {}", spec.name),
                None,
            )
            .await?;

        // badge grant sees the fresh experience total from the claim
        let fresh = self.accounts.load_required(&account.id).await?;
        let badge = self.badges.grant(&fresh, &spec.badge, None).await?;

        info!(account = %account.id, quest = %spec.id, points = spec.points, "quest granted");

        Ok(Some(QuestGrant {
            quest_id: spec.id.to_string(),
            points_awarded: spec.points,
            badge,
        }))
    }

    /// Grant every referral quest whose threshold the account has
    /// reached, then re-check the Quest Master badge
    pub async fn check_referral_quests(&self, account_id: &str) -> Result<Vec<QuestGrant>> {
        let mut grants = Vec::new();

        for quest in catalog::referral_quests() {
            let QuestKind::Referral { threshold } = quest.kind else {
                continue;
            };

            // fresh read per quest so thresholds and experience reflect
            // earlier grants in the same pass
            let Some(account) = self.accounts.load(account_id).await? else {
                return Ok(grants);
            };

            if account.referrals.successful_referrals >= threshold {
                if let Some(grant) = self.grant(&account, quest).await? {
                    grants.push(grant);
                }
            }
        }

        self.check_quest_master(account_id).await?;
        Ok(grants)
    }

    /// Grant the Quest Master badge iff every quest in the master list
    /// is completed
    pub async fn check_quest_master(&self, account_id: &str) -> Result<Option<Badge>> {
        let Some(account) = self.accounts.load(account_id).await? else {
            return Ok(None);
        };

        let all_done = catalog::master_list().all(|id| account.has_completed_quest(id));
        if !all_done {
            return Ok(None);
        }

        self.badges.grant(&account, &catalog::QUEST_MASTER, None).await
    }
}
