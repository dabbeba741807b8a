//! Account document schema
//!
//! One account per wallet identity: profile totals, per-demo progress,
//! earned badges, referral state, and aggregate stats. All mutation goes
//! through the engine store adapters; field semantics here are data only.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{BadgeSpec, DemoId};
use crate::db::schemas::Metadata;

/// Collection name for accounts
pub const ACCOUNT_COLLECTION: &str = "accounts";

/// Demo lifecycle state
///
/// `Completed` is terminal: replays re-enter in-progress-style scoring
/// without the status ever leaving `Completed`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DemoStatus {
    Locked,
    Available,
    InProgress,
    Completed,
}

impl DemoStatus {
    /// Serialized form, used in conditional update filters
    pub fn as_str(&self) -> &'static str {
        match self {
            DemoStatus::Locked => "locked",
            DemoStatus::Available => "available",
            DemoStatus::InProgress => "in_progress",
            DemoStatus::Completed => "completed",
        }
    }
}

/// Per-demo progress record
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DemoProgress {
    pub status: DemoStatus,

    /// Times the demo was started
    #[serde(default)]
    pub attempts: i64,

    /// Most recent completion score (0-100)
    #[serde(default)]
    pub score: i64,

    /// Points from the first completion only; replays never overwrite it
    #[serde(default)]
    pub points_earned: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl DemoProgress {
    /// Fresh progress entry in the given state
    pub fn new(status: DemoStatus) -> Self {
        Self {
            status,
            attempts: 0,
            score: 0,
            points_earned: 0,
            completed_at: None,
            last_attempt_at: None,
        }
    }
}

/// Badge rarity tier
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

/// A granted badge; immutable once appended
///
/// `name` is the de-duplication key: at most one badge per distinct name
/// per account.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    pub points_value: i64,
    pub earned_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_id: Option<String>,
}

impl Badge {
    /// Instantiate a badge from its catalog spec
    pub fn from_spec(spec: &BadgeSpec, demo_id: Option<String>) -> Self {
        Self {
            id: spec.id.to_string(),
            name: spec.name.to_string(),
            rarity: spec.rarity,
            points_value: spec.points,
            earned_at: Utc::now(),
            demo_id,
        }
    }
}

/// Status of a referral history entry
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReferralRecordStatus {
    Pending,
    Completed,
}

/// One referred signup, append-only
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReferralRecord {
    /// Wallet of the referred user (email stand-in for invitation
    /// backfills whose wallet is not yet known)
    pub referred_wallet: String,
    pub referred_name: String,
    pub referral_date: DateTime<Utc>,
    pub status: ReferralRecordStatus,
    pub bonus_earned: i64,
}

/// Referral state embedded in the account
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ReferralState {
    /// This account's own code; empty until assigned
    #[serde(default)]
    pub referral_code: String,

    /// Referrer wallet; set at most once, permanently. Serialized as an
    /// explicit null so set-if-unset claims can filter on it.
    #[serde(default)]
    pub referred_by: Option<String>,

    #[serde(default)]
    pub total_referrals: i64,

    #[serde(default)]
    pub successful_referrals: i64,

    #[serde(default)]
    pub referral_history: Vec<ReferralRecord>,
}

/// Aggregate progression stats
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AccountStats {
    #[serde(default)]
    pub total_demos_completed: i64,

    #[serde(default)]
    pub total_points_earned: i64,

    #[serde(default)]
    pub streak_days: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_date: Option<NaiveDate>,
}

/// Profile totals
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Profile {
    pub level: i64,
    pub total_points: i64,
    pub experience: i64,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            level: 1,
            total_points: 0,
            experience: 0,
        }
    }
}

/// Account document
///
/// Intended invariant: `profile.total_points` equals the signed sum of
/// this account's ledger rows. The store offers no way to enforce the
/// two writes together, so reconciliation repairs drift.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AccountDoc {
    #[serde(rename = "_id")]
    pub id: String,

    pub wallet_address: String,

    #[serde(default)]
    pub profile: Profile,

    /// Progress keyed by canonical demo slug
    #[serde(default)]
    pub demos: BTreeMap<String, DemoProgress>,

    /// Ordered, append-only badge list
    #[serde(default)]
    pub badges: Vec<Badge>,

    #[serde(default)]
    pub referrals: ReferralState,

    #[serde(default)]
    pub stats: AccountStats,

    /// Quest ids completed by this account (set semantics)
    #[serde(default)]
    pub completed_quests: Vec<String>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl AccountDoc {
    /// New account with the demo map seeded from the catalog: entry
    /// demos start available, the rest locked behind their predecessors
    pub fn new(id: impl Into<String>, wallet_address: impl Into<String>) -> Self {
        let mut demos = BTreeMap::new();
        for demo in DemoId::ALL {
            let status = if demo.initially_available() {
                DemoStatus::Available
            } else {
                DemoStatus::Locked
            };
            demos.insert(demo.slug().to_string(), DemoProgress::new(status));
        }

        Self {
            id: id.into(),
            wallet_address: wallet_address.into(),
            profile: Profile::default(),
            demos,
            badges: Vec::new(),
            referrals: ReferralState::default(),
            stats: AccountStats::default(),
            completed_quests: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Progress for a demo slug, if any
    pub fn demo_progress(&self, slug: &str) -> Option<&DemoProgress> {
        self.demos.get(slug)
    }

    /// Whether the demo has ever been completed
    pub fn demo_completed(&self, demo: DemoId) -> bool {
        self.demos
            .get(demo.slug())
            .map(|p| p.status == DemoStatus::Completed)
            .unwrap_or(false)
    }

    /// Whether a badge with this name was already granted
    pub fn has_badge_named(&self, name: &str) -> bool {
        self.badges.iter().any(|b| b.name == name)
    }

    /// Whether the quest id is recorded as completed
    pub fn has_completed_quest(&self, quest_id: &str) -> bool {
        self.completed_quests.iter().any(|q| q == quest_id)
    }

    /// Short display name derived from the wallet
    pub fn display_name(&self) -> String {
        if self.wallet_address.len() <= 10 {
            self.wallet_address.clone()
        } else {
            format!("{}...", &self.wallet_address[..10])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_demo_map() {
        let account = AccountDoc::new("a1", "GABC123WALLET");
        let hello = account.demo_progress(DemoId::HelloEscrow.slug()).unwrap();
        assert_eq!(hello.status, DemoStatus::Available);

        let release = account.demo_progress(DemoId::ReleaseFunds.slug()).unwrap();
        assert_eq!(release.status, DemoStatus::Locked);

        assert!(!account.demo_completed(DemoId::HelloEscrow));
        assert_eq!(account.profile.level, 1);
    }

    #[test]
    fn test_badge_dedup_is_by_name() {
        let mut account = AccountDoc::new("a1", "GABC123WALLET");
        account.badges.push(Badge {
            id: "first-steps".to_string(),
            name: "First Steps".to_string(),
            rarity: Rarity::Common,
            points_value: 25,
            earned_at: Utc::now(),
            demo_id: None,
        });

        assert!(account.has_badge_named("First Steps"));
        assert!(!account.has_badge_named("first-steps"));
    }

    #[test]
    fn test_status_round_trip() {
        let json = serde_json::to_value(DemoStatus::InProgress).unwrap();
        assert_eq!(json, serde_json::json!("in_progress"));
        assert_eq!(DemoStatus::InProgress.as_str(), "in_progress");
    }
}
