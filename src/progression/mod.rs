//! Progression engine
//!
//! Turns "a user finished a demo" into durable changes: account state,
//! point and experience totals, badge unlocks, and the successor-demo
//! unlock. First completions and replays are scored differently; first
//! completion must win an atomic claim, so two sessions can never both
//! take the first-completion reward.

mod badges;
mod demo_stats;
mod guard;

pub use badges::BadgeEvaluator;
pub use demo_stats::DemoStatsStore;
pub use guard::{CompletionClaims, CompletionGuard, CompletionTicket};

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::accounts::{AccountStore, LedgerWriter};
use crate::catalog::{base_points_for, level_for_experience, DemoId};
use crate::db::schemas::{AccountDoc, AccountStats, Badge, DemoStatus, TxType};
use crate::db::{Condition, DocumentStore, Update};
use crate::types::{EngineError, Result};

/// Fraction of the first-completion reward a replay earns
const REPLAY_MULTIPLIER: f64 = 0.25;

/// Floor for the score multiplier: even a zero score earns half points
const MIN_SCORE_MULTIPLIER: f64 = 0.5;

/// Experience granted per point
const XP_PER_POINT: i64 = 2;

/// Result of a completion call, returned to the UI optimistically once
/// the primary reward write lands
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    /// False when a duplicate submission was ignored without effect
    pub accepted: bool,
    pub first_completion: bool,
    pub points_awarded: i64,
    pub badges_granted: Vec<Badge>,
    /// Successor demo that moved from locked to available
    pub demo_unlocked: Option<String>,
    /// Updated account view; absent when the refresh read failed
    pub account: Option<AccountDoc>,
}

impl CompletionOutcome {
    fn ignored() -> Self {
        Self {
            accepted: false,
            first_completion: false,
            points_awarded: 0,
            badges_granted: Vec::new(),
            demo_unlocked: None,
            account: None,
        }
    }
}

/// Orchestrates demo lifecycle and rewards
#[derive(Clone)]
pub struct ProgressionEngine {
    accounts: AccountStore,
    ledger: LedgerWriter,
    demo_stats: DemoStatsStore,
    claims: CompletionClaims,
    badges: BadgeEvaluator,
    guard: CompletionGuard,
    create_timeout: Duration,
}

/// Canonical slug for a raw demo id; unknown ids pass through verbatim
/// and score with default base points
fn canonical_slug(raw: &str) -> String {
    DemoId::resolve(raw)
        .map(|d| d.slug().to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Streak for a completion today, given the previous stats
fn next_streak(stats: &AccountStats, today: NaiveDate) -> i64 {
    match stats.last_active_date {
        Some(last) if last == today => stats.streak_days.max(1),
        Some(last) if last.succ_opt() == Some(today) => stats.streak_days + 1,
        _ => 1,
    }
}

impl ProgressionEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let accounts = AccountStore::new(Arc::clone(&store));
        let ledger = LedgerWriter::new(Arc::clone(&store));
        Self {
            badges: BadgeEvaluator::new(accounts.clone(), ledger.clone()),
            demo_stats: DemoStatsStore::new(Arc::clone(&store)),
            claims: CompletionClaims::new(Arc::clone(&store)),
            guard: CompletionGuard::new(),
            create_timeout: Duration::from_secs(10),
            accounts,
            ledger,
        }
    }

    /// Override the account creation timeout
    pub fn with_create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    /// Create an account for a wallet identity
    pub async fn create_account(&self, wallet_address: &str) -> Result<AccountDoc> {
        let wallet = wallet_address.trim();
        if wallet.is_empty() {
            return Err(EngineError::MissingWallet);
        }

        let create = async {
            if self.accounts.find_by_wallet(wallet).await?.is_some() {
                return Err(EngineError::AccountExists(wallet.to_string()));
            }

            let account = AccountDoc::new(Uuid::new_v4().to_string(), wallet);
            self.accounts.create(&account).await?;
            info!(account = %account.id, wallet = %wallet, "account created");
            Ok(account)
        };

        match tokio::time::timeout(self.create_timeout, create).await {
            Ok(result) => result.map_err(|e| match e {
                EngineError::Database(msg) => EngineError::StoreUnavailable(msg),
                other => other,
            }),
            Err(_) => Err(EngineError::AccountCreationTimeout),
        }
    }

    /// Fetch the account view
    pub async fn get_account(&self, account_id: &str) -> Result<AccountDoc> {
        self.accounts.load_required(account_id).await
    }

    /// Accounts ranked by total points, highest first
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<AccountDoc>> {
        self.accounts.top_by_points(limit).await
    }

    /// Start (or restart) a demo: status to in-progress, attempts
    /// incremented, attempt timestamped. No reward side effects.
    pub async fn start_demo(&self, account_id: &str, demo: &str) -> Result<()> {
        let account = self.accounts.load_required(account_id).await?;
        let slug = canonical_slug(demo);

        let status = account
            .demo_progress(&slug)
            .map(|p| p.status)
            // entries exist for catalog demos from account creation;
            // unknown ids behave as always-available
            .unwrap_or(DemoStatus::Available);

        if status == DemoStatus::Locked {
            return Err(EngineError::DemoLocked(slug));
        }

        let mut update = Update::new()
            .inc(format!("demos.{slug}.attempts"), 1)
            .set(format!("demos.{slug}.last_attempt_at"), json!(Utc::now()));

        // a completed demo is replayed without its status ever leaving
        // completed
        if status != DemoStatus::Completed {
            update = update.set(format!("demos.{slug}.status"), json!("in_progress"));
        }

        self.accounts.apply(account_id, update).await?;
        debug!(account = %account_id, demo = %slug, "demo started");
        Ok(())
    }

    /// Complete a demo and apply rewards
    pub async fn complete_demo(
        &self,
        account_id: &str,
        demo: &str,
        score: u32,
    ) -> Result<CompletionOutcome> {
        if score > 100 {
            return Err(EngineError::InvalidScore(score));
        }

        let slug = canonical_slug(demo);

        // same-session double-submit: refuse silently, no effect
        let Some(_ticket) = self.guard.try_acquire(account_id, &slug) else {
            debug!(account = %account_id, demo = %slug, "completion already in flight");
            return Ok(CompletionOutcome::ignored());
        };

        let account = self.accounts.load_required(account_id).await?;
        let progress = account.demo_progress(&slug);
        let was_completed = progress
            .map(|p| p.status == DemoStatus::Completed)
            .unwrap_or(false);
        let attempt = progress.map(|p| p.attempts).unwrap_or(0).max(1);

        // cross-session idempotency: one claim per (account, demo, attempt)
        if !self.claims.try_claim(account_id, &slug, attempt).await? {
            debug!(account = %account_id, demo = %slug, attempt, "completion attempt already claimed");
            return Ok(CompletionOutcome::ignored());
        }

        let base = base_points_for(demo);
        let multiplier = (score as f64 / 100.0).max(MIN_SCORE_MULTIPLIER);
        let first_points = (base as f64 * multiplier).round() as i64;

        let now = Utc::now();
        let today = now.date_naive();
        let streak = next_streak(&account.stats, today);

        // First completion goes through the atomic claim; a session that
        // loses the race falls through and is re-scored as a replay.
        let mut awarded_first = false;
        if !was_completed {
            let xp = first_points * XP_PER_POINT;
            let update = Update::new()
                .set(format!("demos.{slug}.status"), json!("completed"))
                .set(format!("demos.{slug}.completed_at"), json!(now))
                .set(format!("demos.{slug}.score"), json!(score))
                .set(format!("demos.{slug}.points_earned"), json!(first_points))
                .inc("profile.total_points", first_points)
                .inc("profile.experience", xp)
                .inc("stats.total_points_earned", first_points)
                .inc("stats.total_demos_completed", 1)
                .set(
                    "profile.level",
                    json!(level_for_experience(account.profile.experience + xp)),
                )
                .set("stats.streak_days", json!(streak))
                .set("stats.last_active_date", json!(today));

            awarded_first = self
                .accounts
                .claim_first_completion(account_id, &slug, update)
                .await?;
        }

        let points = if awarded_first {
            first_points
        } else {
            // replay dampening: a quarter of the fresh reward, never zero
            let replay_points = (first_points as f64 * REPLAY_MULTIPLIER).round() as i64;
            let xp = replay_points * XP_PER_POINT;
            let update = Update::new()
                .set(format!("demos.{slug}.completed_at"), json!(now))
                .set(format!("demos.{slug}.score"), json!(score))
                .inc("profile.total_points", replay_points)
                .inc("profile.experience", xp)
                .inc("stats.total_points_earned", replay_points)
                .set(
                    "profile.level",
                    json!(level_for_experience(account.profile.experience + xp)),
                )
                .set("stats.streak_days", json!(streak))
                .set("stats.last_active_date", json!(today));

            self.accounts.apply(account_id, update).await?;
            replay_points
        };

        let reason = if awarded_first {
            format!("Completed {slug}")
        } else {
            format!("Replay bonus for {slug}")
        };
        self.ledger
            .append(account_id, TxType::Earn, points, reason, Some(slug.clone()))
            .await?;

        // global counter: best-effort, never blocks the grant
        match self.demo_stats.increment_completions(&slug).await {
            Ok(total) => debug!(demo = %slug, total, "demo completion counted"),
            Err(e) => warn!(demo = %slug, "demo counter increment failed: {}", e),
        }

        // secondary effects only follow a won first completion; their
        // failure leaves points and progress in place for the next
        // completion or a reconciliation pass to self-heal
        let mut badges_granted = Vec::new();
        let mut demo_unlocked = None;
        if awarded_first {
            if let Some(demo_id) = DemoId::resolve(demo) {
                match self.badges.after_completion(account_id, demo_id).await {
                    Ok(granted) => badges_granted = granted,
                    Err(e) => warn!(account = %account_id, "badge evaluation failed: {}", e),
                }

                match self.unlock_successor(account_id, demo_id).await {
                    Ok(unlocked) => demo_unlocked = unlocked,
                    Err(e) => warn!(account = %account_id, "successor unlock failed: {}", e),
                }
            }
        }

        info!(
            account = %account_id,
            demo = %slug,
            points,
            first = awarded_first,
            "demo completed"
        );

        let refreshed = match self.accounts.load(account_id).await {
            Ok(view) => view,
            Err(e) => {
                warn!(account = %account_id, "view refresh failed: {}", e);
                None
            }
        };

        Ok(CompletionOutcome {
            accepted: true,
            first_completion: awarded_first,
            points_awarded: points,
            badges_granted,
            demo_unlocked,
            account: refreshed,
        })
    }

    /// Move the successor demo from locked to available
    async fn unlock_successor(&self, account_id: &str, demo: DemoId) -> Result<Option<String>> {
        let Some(next) = demo.next() else {
            return Ok(None);
        };

        let conditions = vec![(
            format!("demos.{}.status", next.slug()),
            Condition::Eq(json!("locked")),
        )];
        let update = Update::new().set(format!("demos.{}.status", next.slug()), json!("available"));

        let unlocked = self.accounts.apply_if(account_id, &conditions, update).await?;
        if unlocked {
            info!(account = %account_id, demo = %next.slug(), "demo unlocked");
            Ok(Some(next.slug().to_string()))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    #[test]
    fn test_scoring_formula() {
        // base 100: perfect score earns base, the multiplier floors at 0.5
        let score = |base: i64, s: u32| {
            (base as f64 * (s as f64 / 100.0).max(MIN_SCORE_MULTIPLIER)).round() as i64
        };
        assert_eq!(score(100, 100), 100);
        assert_eq!(score(100, 80), 80);
        assert_eq!(score(100, 50), 50);
        assert_eq!(score(100, 0), 50);
        assert_eq!(score(150, 33), 75);

        // replay earns a quarter, rounded, never zero for real bases
        let replay = |p: i64| (p as f64 * REPLAY_MULTIPLIER).round() as i64;
        assert_eq!(replay(100), 25);
        assert_eq!(replay(50), 13);
        assert_eq!(replay(2), 1);
    }

    #[test]
    fn test_streak_progression() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let yesterday = today.pred_opt().unwrap();

        let mut stats = AccountStats::default();
        assert_eq!(next_streak(&stats, today), 1);

        stats.last_active_date = Some(yesterday);
        stats.streak_days = 3;
        assert_eq!(next_streak(&stats, today), 4);

        stats.last_active_date = Some(today);
        stats.streak_days = 4;
        assert_eq!(next_streak(&stats, today), 4);

        stats.last_active_date = today.checked_sub_days(Days::new(2));
        assert_eq!(next_streak(&stats, today), 1);
    }

    #[test]
    fn test_canonical_slug_passthrough() {
        assert_eq!(canonical_slug("demo1"), "hello-escrow");
        assert_eq!(canonical_slug("custom-event-demo"), "custom-event-demo");
    }
}
