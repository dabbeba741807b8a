//! Database schemas for questline
//!
//! Defines the document structures for accounts, the points ledger,
//! referral invitations, completion claims, and demo counters.

mod account;
mod claim;
mod demo_stat;
mod invitation;
mod ledger;
mod metadata;

pub use account::{
    AccountDoc, AccountStats, Badge, DemoProgress, DemoStatus, Profile, Rarity, ReferralRecord,
    ReferralRecordStatus, ReferralState, ACCOUNT_COLLECTION,
};
pub use claim::{CompletionClaimDoc, CLAIM_COLLECTION};
pub use demo_stat::{DemoStatDoc, DEMO_STATS_COLLECTION};
pub use invitation::{InvitationStatus, ReferralInvitationDoc, INVITATION_COLLECTION};
pub use ledger::{PointsTransactionDoc, TxType, LEDGER_COLLECTION};
pub use metadata::Metadata;
