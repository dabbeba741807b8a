//! Questline reconciler worker
//!
//! Periodically voids overdue invitations and backfills referral
//! records that the non-transactional write pattern left behind.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use questline::referral::LogNotifier;
use questline::{Args, DocumentStore, MemoryStore, MongoStore, ReferralEngine, WebhookNotifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("questline={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Questline reconciler");
    info!("======================================");
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Sweep interval: {}s", args.reconcile_interval_secs);
    info!("Invitation expiry: {} days", args.invitation_expiry_days);
    info!("======================================");

    let store: Arc<dyn DocumentStore> = if args.dev_mode {
        info!("Dev mode: using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        match MongoStore::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let notifier: Arc<dyn questline::referral::InvitationNotifier> = match &args.notify_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    };

    let engine =
        ReferralEngine::new(store, notifier).with_expiry_days(args.invitation_expiry_days);

    let interval = Duration::from_secs(args.reconcile_interval_secs);
    loop {
        match engine.reconcile_all().await {
            Ok(summary) => {
                info!(
                    expired = summary.expired_invitations,
                    backfilled = summary.referrals_backfilled,
                    "sweep complete"
                );
            }
            Err(e) => {
                error!("reconciliation sweep failed: {}", e);
            }
        }

        tokio::time::sleep(interval).await;
    }
}
