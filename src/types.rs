//! Error types for the progression and referral engines
//!
//! Input errors are rejected before any write; not-found errors
//! short-circuit with no partial effect; store errors during a write
//! sequence leave whatever partial state preceded the failure.

use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// Score outside the accepted 0-100 range
    #[error("score {0} is out of range (expected 0-100)")]
    InvalidScore(u32),

    /// Account creation requires a wallet address
    #[error("wallet address is required")]
    MissingWallet,

    /// An account already exists for this wallet
    #[error("account already exists for wallet {0}")]
    AccountExists(String),

    /// No account with this id
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Demo has not been unlocked yet
    #[error("demo '{0}' is locked")]
    DemoLocked(String),

    /// Quest id not present in the catalog
    #[error("unknown quest: {0}")]
    UnknownQuest(String),

    /// Referral code is empty or does not resolve to an account
    #[error("invalid referral code")]
    InvalidCode,

    /// A referral code cannot be applied to its own account
    #[error("cannot apply your own referral code")]
    SelfReferral,

    /// The account already has a referrer recorded
    #[error("account already has a referrer")]
    AlreadyReferred,

    /// Sending invitations requires the referrer to have a code
    #[error("referrer has no referral code")]
    MissingReferralCode,

    /// Invitation email is empty or malformed
    #[error("invalid email address")]
    InvalidEmail,

    /// Invitation delivery failed; the invitation record is kept
    #[error("invitation delivery failed: {0}")]
    DeliveryFailed(String),

    /// Account creation did not finish within the configured timeout
    #[error("account creation timed out")]
    AccountCreationTimeout,

    /// The document store could not be reached
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Document store operation failed
    #[error("database error: {0}")]
    Database(String),

    /// Internal invariant violation
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Whether this error is an input rejection (safe to show verbatim)
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidScore(_)
                | EngineError::MissingWallet
                | EngineError::DemoLocked(_)
                | EngineError::UnknownQuest(_)
                | EngineError::InvalidCode
                | EngineError::SelfReferral
                | EngineError::AlreadyReferred
                | EngineError::MissingReferralCode
                | EngineError::InvalidEmail
        )
    }
}
