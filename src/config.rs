//! Configuration for the questline engines
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;

/// Questline - progression and referral engine for the escrow academy
#[derive(Parser, Debug, Clone)]
#[command(name = "questline")]
#[command(about = "Progression and referral engine backing the escrow academy")]
pub struct Args {
    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "questline")]
    pub mongodb_db: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable development mode (in-memory store, no MongoDB required)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Account creation timeout in milliseconds
    #[arg(long, env = "ACCOUNT_CREATE_TIMEOUT_MS", default_value = "10000")]
    pub account_create_timeout_ms: u64,

    /// Days before a sent referral invitation expires
    #[arg(long, env = "INVITATION_EXPIRY_DAYS", default_value = "30")]
    pub invitation_expiry_days: i64,

    /// Interval between reconciliation sweeps in seconds
    #[arg(long, env = "RECONCILE_INTERVAL_SECS", default_value = "300")]
    pub reconcile_interval_secs: u64,

    /// Webhook URL for invitation delivery (logs locally when unset)
    #[arg(long, env = "NOTIFY_URL")]
    pub notify_url: Option<String>,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.invitation_expiry_days <= 0 {
            return Err("INVITATION_EXPIRY_DAYS must be positive".to_string());
        }

        if self.reconcile_interval_secs == 0 {
            return Err("RECONCILE_INTERVAL_SECS must be positive".to_string());
        }

        if !self.dev_mode && self.mongodb_uri.is_empty() {
            return Err("MONGODB_URI is required outside dev mode".to_string());
        }

        Ok(())
    }
}
