//! Questline - progression and referral engine for the escrow academy
//!
//! Backend subsystem that turns demo completions into durable reward
//! state: point and experience ledgers, badge unlocks, demo unlock
//! chains, and a referral bonus cascade, all against a hosted document
//! database that offers only per-field atomic primitives.
//!
//! ## Services
//!
//! - **Catalog**: static demo, badge, and quest reward tables
//! - **Progression**: demo lifecycle, completion scoring, badge grants
//! - **Referral**: codes, signup bonuses, quest cascade, invitations
//! - **Reconciler**: periodic repair of invitation and referral drift

pub mod accounts;
pub mod catalog;
pub mod config;
pub mod db;
pub mod progression;
pub mod referral;
pub mod types;

pub use config::Args;
pub use db::{DocumentStore, MemoryStore, MongoStore};
pub use progression::{CompletionOutcome, ProgressionEngine};
pub use referral::{LogNotifier, ReferralEngine, ReferralStats, WebhookNotifier};
pub use types::{EngineError, Result};
