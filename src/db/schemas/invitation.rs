//! Referral invitation document schema
//!
//! Pre-account email invites. An invitation is persisted before delivery
//! is attempted; delivery failures mark it failed but the record is kept
//! for audit. Overdue invitations are voided by the reconciler sweep.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::schemas::Metadata;

/// Collection name for referral invitations
pub const INVITATION_COLLECTION: &str = "referral_invitations";

/// Invitation lifecycle state
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Sent,
    Completed,
    Failed,
}

impl InvitationStatus {
    /// Serialized form, used in query filters
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Sent => "sent",
            InvitationStatus::Completed => "completed",
            InvitationStatus::Failed => "failed",
        }
    }
}

/// Email invitation tied to a referrer's code
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReferralInvitationDoc {
    #[serde(rename = "_id")]
    pub id: String,

    /// Wallet of the referrer who sent the invite
    pub referrer_wallet: String,

    /// Invited email address
    pub email: String,

    /// Referral code the invite carries
    pub referral_code: String,

    /// Optional personal message included with the invite
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub invitation_date: DateTime<Utc>,

    pub status: InvitationStatus,

    /// Invitations past this instant are treated as void
    pub expires_at: DateTime<Utc>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl ReferralInvitationDoc {
    /// Create a freshly sent invitation expiring after `expiry_days`
    pub fn new(
        referrer_wallet: impl Into<String>,
        email: impl Into<String>,
        referral_code: impl Into<String>,
        message: Option<String>,
        expiry_days: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            referrer_wallet: referrer_wallet.into(),
            email: email.into(),
            referral_code: referral_code.into(),
            message,
            invitation_date: now,
            status: InvitationStatus::Sent,
            expires_at: now + Duration::days(expiry_days),
            metadata: Metadata::new(),
        }
    }

    /// Whether the invitation is past its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_expiry_window() {
        let invitation =
            ReferralInvitationDoc::new("GREFERRER", "friend@example.com", "GREFER-ABC123", None, 30);

        assert_eq!(invitation.status, InvitationStatus::Sent);
        assert!(!invitation.is_expired(Utc::now()));
        assert!(invitation.is_expired(Utc::now() + Duration::days(31)));
    }
}
