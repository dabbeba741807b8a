//! Referral engine
//!
//! Generates and resolves referral codes, applies signup bonuses,
//! cascades referral-count quests and badges, and tracks email
//! invitations with expiry. Reward writes follow the same pattern as
//! the progression engine: account update first, ledger row second,
//! quest cascade last.

mod codes;
mod invitations;
mod quests;
mod reconcile;

pub use codes::candidate as referral_code_candidate;
pub use invitations::{InvitationNotifier, InvitationStore, LogNotifier, WebhookNotifier};
pub use quests::QuestGrant;
pub use reconcile::SweepSummary;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::accounts::{AccountStore, LedgerWriter};
use crate::catalog::{self, level_for_experience};
use crate::db::schemas::{
    AccountDoc, ReferralInvitationDoc, ReferralRecord, ReferralRecordStatus, TxType,
};
use crate::db::{DocumentStore, Update};
use crate::progression::BadgeEvaluator;
use crate::types::{EngineError, Result};

use quests::QuestEvaluator;

/// One-time bonus for signing up with someone's code
pub const REFERRED_SIGNUP_BONUS: i64 = 25;

/// Bonus the referrer earns per successful referral
pub const REFERRER_BONUS: i64 = 50;

/// Result of referral initialization
#[derive(Debug, Clone, Serialize)]
pub struct ReferralInit {
    pub referral_code: String,
    pub bonus_earned: i64,
}

/// Result of applying a referral code post-signup
#[derive(Debug, Clone, Serialize)]
pub struct ReferralApplied {
    pub success: bool,
    pub bonus_earned: i64,
}

/// Result of completing a social quest
#[derive(Debug, Clone, Serialize)]
pub struct QuestOutcome {
    pub grant: Option<QuestGrant>,
}

/// Receipt for a sent invitation
#[derive(Debug, Clone, Serialize)]
pub struct InvitationReceipt {
    pub invitation_id: String,
}

/// Referral stats view for the UI
#[derive(Debug, Clone, Serialize)]
pub struct ReferralStats {
    pub total_referrals: i64,
    pub successful_referrals: i64,
    pub referral_code: String,
    pub total_bonus_earned: i64,
    pub recent_referrals: Vec<ReferralRecord>,
}

/// Orchestrates referral codes, bonuses, quests, and invitations
#[derive(Clone)]
pub struct ReferralEngine {
    pub(crate) accounts: AccountStore,
    pub(crate) ledger: LedgerWriter,
    pub(crate) invitations: InvitationStore,
    quests: QuestEvaluator,
    notifier: Arc<dyn InvitationNotifier>,
    expiry_days: i64,
}

impl ReferralEngine {
    pub fn new(store: Arc<dyn DocumentStore>, notifier: Arc<dyn InvitationNotifier>) -> Self {
        let accounts = AccountStore::new(Arc::clone(&store));
        let ledger = LedgerWriter::new(Arc::clone(&store));
        let badges = BadgeEvaluator::new(accounts.clone(), ledger.clone());
        Self {
            quests: QuestEvaluator::new(accounts.clone(), ledger.clone(), badges),
            invitations: InvitationStore::new(Arc::clone(&store)),
            notifier,
            expiry_days: 30,
            accounts,
            ledger,
        }
    }

    /// Override the invitation expiry window
    pub fn with_expiry_days(mut self, days: i64) -> Self {
        self.expiry_days = days;
        self
    }

    /// Assign a referral code to an account and, when a referrer code
    /// or invitation email is supplied, apply the signup cascade.
    ///
    /// An unresolvable referrer code is skipped silently - the new
    /// account still gets its own code. Invitation tracking is
    /// best-effort and never aborts the call.
    pub async fn initialize_referral_system(
        &self,
        account_id: &str,
        referred_by_code: Option<&str>,
        email: Option<&str>,
    ) -> Result<ReferralInit> {
        let account = self.accounts.load_required(account_id).await?;

        let referral_code = if account.referrals.referral_code.is_empty() {
            let code = codes::generate_unique(&self.accounts, &account.wallet_address).await?;
            self.accounts
                .apply(
                    account_id,
                    Update::new().set("referrals.referral_code", json!(code)),
                )
                .await?;
            info!(account = %account_id, code = %code, "referral code assigned");
            code
        } else {
            account.referrals.referral_code.clone()
        };

        let mut bonus_earned = 0;
        if let Some(code) = referred_by_code.map(str::trim).filter(|c| !c.is_empty()) {
            match self.accounts.find_by_referral_code(code).await? {
                None => {
                    warn!(code = %code, "referrer code did not resolve, skipping referral");
                }
                Some(referrer) if referrer.id == account.id => {
                    warn!(account = %account_id, "own referral code supplied at signup, skipping");
                }
                Some(referrer) => {
                    if self
                        .accounts
                        .set_referred_by_if_unset(account_id, &referrer.wallet_address)
                        .await?
                    {
                        self.grant_signup_bonus(&account).await?;
                        self.update_referrer_stats(&referrer.id, &account).await?;
                        bonus_earned = REFERRED_SIGNUP_BONUS;
                    }
                }
            }
        }

        if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
            if let Err(e) = self.complete_invitation_for(email).await {
                warn!(email = %email, "invitation tracking failed (non-fatal): {}", e);
            }
        }

        Ok(ReferralInit {
            referral_code,
            bonus_earned,
        })
    }

    /// Apply a referral code to an existing account (user-initiated,
    /// post-signup). One-time: a second call always fails with
    /// `AlreadyReferred`, even with a different valid code.
    pub async fn apply_referral_code(&self, account_id: &str, code: &str) -> Result<ReferralApplied> {
        let account = self.accounts.load_required(account_id).await?;

        if account.referrals.referred_by.is_some() {
            return Err(EngineError::AlreadyReferred);
        }

        let code = code.trim();
        if code.is_empty() {
            return Err(EngineError::InvalidCode);
        }

        let referrer = self
            .accounts
            .find_by_referral_code(code)
            .await?
            .ok_or(EngineError::InvalidCode)?;

        if referrer.wallet_address == account.wallet_address {
            return Err(EngineError::SelfReferral);
        }

        // the set-if-unset claim is the idempotency backstop against a
        // concurrent apply with another code
        if !self
            .accounts
            .set_referred_by_if_unset(account_id, &referrer.wallet_address)
            .await?
        {
            return Err(EngineError::AlreadyReferred);
        }

        self.grant_signup_bonus(&account).await?;
        self.update_referrer_stats(&referrer.id, &account).await?;

        Ok(ReferralApplied {
            success: true,
            bonus_earned: REFERRED_SIGNUP_BONUS,
        })
    }

    /// Credit a referrer for a referred signup: history record, counter
    /// increments, bonus points, then the referral quest cascade
    pub async fn update_referrer_stats(
        &self,
        referrer_id: &str,
        referred: &AccountDoc,
    ) -> Result<()> {
        self.credit_referral(referrer_id, &referred.wallet_address, &referred.display_name())
            .await?;
        self.quests.check_referral_quests(referrer_id).await?;
        Ok(())
    }

    /// Complete a social quest (community join, share flows) for an
    /// account, then re-check the Quest Master badge
    pub async fn complete_social_quest(
        &self,
        account_id: &str,
        quest_id: &str,
    ) -> Result<QuestOutcome> {
        let spec = catalog::quest(quest_id)
            .filter(|q| q.kind == catalog::QuestKind::Social)
            .ok_or_else(|| EngineError::UnknownQuest(quest_id.to_string()))?;

        let account = self.accounts.load_required(account_id).await?;
        let grant = self.quests.grant(&account, spec).await?;
        if grant.is_some() {
            self.quests.check_quest_master(account_id).await?;
        }

        Ok(QuestOutcome { grant })
    }

    /// Persist and deliver an email invitation. The record is written
    /// before delivery; on delivery failure it is marked failed and
    /// kept.
    pub async fn send_referral_invitation(
        &self,
        referrer_id: &str,
        email: &str,
        message: Option<String>,
    ) -> Result<InvitationReceipt> {
        let referrer = self.accounts.load_required(referrer_id).await?;
        if referrer.referrals.referral_code.is_empty() {
            return Err(EngineError::MissingReferralCode);
        }

        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(EngineError::InvalidEmail);
        }

        let invitation = ReferralInvitationDoc::new(
            referrer.wallet_address.clone(),
            email,
            referrer.referrals.referral_code.clone(),
            message,
            self.expiry_days,
        );
        self.invitations.create(&invitation).await?;

        match self.notifier.deliver(&invitation).await {
            Ok(()) => {
                info!(invitation = %invitation.id, email = %email, "invitation sent");
                Ok(InvitationReceipt {
                    invitation_id: invitation.id,
                })
            }
            Err(e) => {
                if let Err(mark_err) = self.invitations.mark_failed(&invitation.id).await {
                    warn!(invitation = %invitation.id, "failed to mark invitation: {}", mark_err);
                }
                Err(EngineError::DeliveryFailed(e.to_string()))
            }
        }
    }

    /// Reconciliation: backfill referral records for completed
    /// invitations not yet reflected in the history. Returns the number
    /// of referrals backfilled.
    pub async fn check_for_new_referrals(&self, account_id: &str) -> Result<usize> {
        let account = self.accounts.load_required(account_id).await?;
        if account.referrals.referral_code.is_empty() {
            return Ok(0);
        }

        let completed = self
            .invitations
            .completed_for(&account.wallet_address)
            .await?;

        // the email is the stand-in identifier until the referred wallet
        // is known
        let mut known: Vec<String> = account
            .referrals
            .referral_history
            .iter()
            .map(|r| r.referred_wallet.clone())
            .collect();

        let mut backfilled = 0;
        for invitation in completed {
            if known.contains(&invitation.email) {
                continue;
            }

            self.credit_referral(account_id, &invitation.email, &invitation.email)
                .await?;
            known.push(invitation.email.clone());
            backfilled += 1;
        }

        if backfilled > 0 {
            info!(account = %account_id, backfilled, "referral history backfilled");
            self.quests.check_referral_quests(account_id).await?;
        }

        Ok(backfilled)
    }

    /// Referral stats view; pure read
    pub async fn get_referral_stats(&self, account_id: &str) -> Result<ReferralStats> {
        let account = self.accounts.load_required(account_id).await?;
        let referrals = &account.referrals;

        let total_bonus_earned = referrals
            .referral_history
            .iter()
            .map(|r| r.bonus_earned)
            .sum();

        let mut recent_referrals: Vec<ReferralRecord> = referrals
            .referral_history
            .iter()
            .rev()
            .take(5)
            .cloned()
            .collect();
        recent_referrals.shrink_to_fit();

        Ok(ReferralStats {
            total_referrals: referrals.total_referrals,
            successful_referrals: referrals.successful_referrals,
            referral_code: referrals.referral_code.clone(),
            total_bonus_earned,
            recent_referrals,
        })
    }

    /// One-time signup bonus for the referred account
    async fn grant_signup_bonus(&self, account: &AccountDoc) -> Result<()> {
        let xp_after = account.profile.experience + REFERRED_SIGNUP_BONUS;
        let update = Update::new()
            .inc("profile.total_points", REFERRED_SIGNUP_BONUS)
            .inc("profile.experience", REFERRED_SIGNUP_BONUS)
            .set("profile.level", json!(level_for_experience(xp_after)));
        self.accounts.apply(&account.id, update).await?;

        self.ledger
            .append(
                &account.id,
                TxType::Bonus,
                REFERRED_SIGNUP_BONUS,
                "Referral signup bonus",
                None,
            )
            .await?;

        info!(account = %account.id, bonus = REFERRED_SIGNUP_BONUS, "signup bonus granted");
        Ok(())
    }

    /// Append one referral record and its reward to the referrer
    async fn credit_referral(
        &self,
        referrer_id: &str,
        referred_wallet: &str,
        referred_name: &str,
    ) -> Result<()> {
        let referrer = self.accounts.load_required(referrer_id).await?;

        let record = ReferralRecord {
            referred_wallet: referred_wallet.to_string(),
            referred_name: referred_name.to_string(),
            referral_date: Utc::now(),
            status: ReferralRecordStatus::Completed,
            bonus_earned: REFERRER_BONUS,
        };
        let record_value = serde_json::to_value(&record)
            .map_err(|e| EngineError::Internal(format!("record serialization failed: {}", e)))?;

        let xp_after = referrer.profile.experience + REFERRER_BONUS;
        let update = Update::new()
            .push("referrals.referral_history", record_value)
            .inc("referrals.total_referrals", 1)
            .inc("referrals.successful_referrals", 1)
            .inc("profile.total_points", REFERRER_BONUS)
            .inc("profile.experience", REFERRER_BONUS)
            .set("profile.level", json!(level_for_experience(xp_after)));
        self.accounts.apply(referrer_id, update).await?;

        self.ledger
            .append(
                referrer_id,
                TxType::Bonus,
                REFERRER_BONUS,
                format!("Referral bonus for {referred_name}"),
                None,
            )
            .await?;

        info!(referrer = %referrer_id, referred = %referred_wallet, "referral credited");
        Ok(())
    }

    /// Best-effort: mark a pending invitation for this email completed
    async fn complete_invitation_for(&self, email: &str) -> Result<()> {
        if let Some(invitation) = self.invitations.find_pending(email).await? {
            self.invitations.mark_completed(&invitation.id).await?;
        }
        Ok(())
    }
}
