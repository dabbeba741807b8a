//! Referral engine integration tests over the in-memory store

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use questline::accounts::LedgerWriter;
use questline::db::schemas::{ReferralInvitationDoc, ReferralRecordStatus, TxType};
use questline::db::{DocumentStore, MemoryStore};
use questline::referral::{InvitationNotifier, InvitationStore, LogNotifier};
use questline::types::Result as EngineResult;
use questline::{EngineError, ProgressionEngine, ReferralEngine};

fn setup() -> (Arc<MemoryStore>, ProgressionEngine, ReferralEngine) {
    let mem = Arc::new(MemoryStore::new());
    let store: Arc<dyn DocumentStore> = mem.clone();
    let progression = ProgressionEngine::new(Arc::clone(&store));
    let referral = ReferralEngine::new(store, Arc::new(LogNotifier));
    (mem, progression, referral)
}

/// Create an account and assign its referral code
async fn signup(
    progression: &ProgressionEngine,
    referral: &ReferralEngine,
    wallet: &str,
    referred_by: Option<&str>,
) -> (String, String) {
    let account = progression.create_account(wallet).await.unwrap();
    let init = referral
        .initialize_referral_system(&account.id, referred_by, None)
        .await
        .unwrap();
    (account.id, init.referral_code)
}

#[tokio::test]
async fn test_signup_with_code_credits_both_sides() {
    let (mem, progression, referral) = setup();

    let (referrer_id, code) = signup(&progression, &referral, "GREFERRER01", None).await;
    assert_eq!(code.len(), 12);
    assert!(code.starts_with("GREFER"));

    let referred = progression.create_account("GREFERRED01").await.unwrap();
    let init = referral
        .initialize_referral_system(&referred.id, Some(&code), None)
        .await
        .unwrap();
    assert_eq!(init.bonus_earned, 25);

    let referred_view = progression.get_account(&referred.id).await.unwrap();
    assert_eq!(referred_view.profile.total_points, 25);
    assert_eq!(referred_view.profile.experience, 25);
    assert_eq!(
        referred_view.referrals.referred_by.as_deref(),
        Some("GREFERRER01")
    );

    let referrer_view = progression.get_account(&referrer_id).await.unwrap();
    assert_eq!(referrer_view.referrals.total_referrals, 1);
    assert_eq!(referrer_view.referrals.successful_referrals, 1);

    let record = &referrer_view.referrals.referral_history[0];
    assert_eq!(record.referred_wallet, "GREFERRED01");
    assert_eq!(record.status, ReferralRecordStatus::Completed);
    assert_eq!(record.bonus_earned, 50);

    // referrer bonus 50, refer-1 quest 50, First Friend badge 25
    assert_eq!(referrer_view.profile.total_points, 125);
    assert!(referrer_view.has_badge_named("First Friend"));
    assert!(referrer_view.has_completed_quest("refer-1-friend"));

    let ledger = LedgerWriter::new(mem as Arc<dyn DocumentStore>);
    let rows = ledger.entries_for(&referrer_id).await.unwrap();
    let bonus = rows.iter().find(|r| r.tx_type == TxType::Bonus).unwrap();
    assert_eq!(bonus.amount, 50);
}

#[tokio::test]
async fn test_apply_code_rejections() {
    let (_, progression, referral) = setup();

    let (account_id, own_code) = signup(&progression, &referral, "GSELF00001", None).await;
    let (_, other_code) = signup(&progression, &referral, "GOTHER0001", None).await;
    let (_, third_code) = signup(&progression, &referral, "GTHIRD0001", None).await;

    assert!(matches!(
        referral.apply_referral_code(&account_id, &own_code).await,
        Err(EngineError::SelfReferral)
    ));
    assert!(matches!(
        referral.apply_referral_code(&account_id, "").await,
        Err(EngineError::InvalidCode)
    ));
    assert!(matches!(
        referral.apply_referral_code(&account_id, "NOSUCHCODE99").await,
        Err(EngineError::InvalidCode)
    ));

    let applied = referral
        .apply_referral_code(&account_id, &other_code)
        .await
        .unwrap();
    assert!(applied.success);
    assert_eq!(applied.bonus_earned, 25);

    // one-time use: a different valid code still fails
    assert!(matches!(
        referral.apply_referral_code(&account_id, &third_code).await,
        Err(EngineError::AlreadyReferred)
    ));
}

#[tokio::test]
async fn test_quest_cascade_thresholds() {
    let (_, progression, referral) = setup();

    let (referrer_id, code) = signup(&progression, &referral, "GCASCADE01", None).await;

    for i in 0..5 {
        let wallet = format!("GFRIEND{i:04}");
        signup(&progression, &referral, &wallet, Some(&code)).await;
    }

    let view = progression.get_account(&referrer_id).await.unwrap();
    assert_eq!(view.referrals.successful_referrals, 5);

    // the 5-friend badge never appears without the 1-friend badge
    assert!(view.has_badge_named("First Friend"));
    assert!(view.has_badge_named("Crew Builder"));
    assert!(!view.has_badge_named("Ambassador"));
    assert!(view.has_completed_quest("refer-1-friend"));
    assert!(view.has_completed_quest("refer-5-friends"));
    assert!(!view.has_completed_quest("refer-10-friends"));
}

#[tokio::test]
async fn test_referral_stats_view() {
    let (_, progression, referral) = setup();

    let (referrer_id, code) = signup(&progression, &referral, "GSTATS0001", None).await;

    for i in 0..6 {
        let wallet = format!("GPAL{i:06}");
        signup(&progression, &referral, &wallet, Some(&code)).await;
    }

    let stats = referral.get_referral_stats(&referrer_id).await.unwrap();
    assert_eq!(stats.total_referrals, 6);
    assert_eq!(stats.successful_referrals, 6);
    assert_eq!(stats.referral_code, code);
    assert_eq!(stats.total_bonus_earned, 300);
    assert_eq!(stats.recent_referrals.len(), 5);
    // newest first
    assert_eq!(stats.recent_referrals[0].referred_wallet, "GPAL000005");
}

#[tokio::test]
async fn test_invitation_lifecycle_and_backfill() {
    let (_, progression, referral) = setup();

    let (referrer_id, _) = signup(&progression, &referral, "GINVITER01", None).await;

    let receipt = referral
        .send_referral_invitation(&referrer_id, "friend@example.com", Some("join me".into()))
        .await
        .unwrap();
    assert!(!receipt.invitation_id.is_empty());

    // the invited email signs up without a code; the invitation is
    // completed but no referral is credited yet
    let invited = progression.create_account("GINVITED01").await.unwrap();
    referral
        .initialize_referral_system(&invited.id, None, Some("friend@example.com"))
        .await
        .unwrap();

    let before = progression.get_account(&referrer_id).await.unwrap();
    assert_eq!(before.referrals.successful_referrals, 0);

    // reconciliation repairs the gap, matched by email stand-in
    let backfilled = referral.check_for_new_referrals(&referrer_id).await.unwrap();
    assert_eq!(backfilled, 1);

    let after = progression.get_account(&referrer_id).await.unwrap();
    assert_eq!(after.referrals.successful_referrals, 1);
    assert_eq!(
        after.referrals.referral_history[0].referred_wallet,
        "friend@example.com"
    );
    assert!(after.has_badge_named("First Friend"));

    // a second pass finds nothing new
    let again = referral.check_for_new_referrals(&referrer_id).await.unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
async fn test_invitation_expiry_sweep() {
    let (mem, _, _) = setup();
    let store: Arc<dyn DocumentStore> = mem;
    let invitations = InvitationStore::new(store);

    let fresh = ReferralInvitationDoc::new("GW1", "fresh@example.com", "CODE1", None, 30);
    let overdue = ReferralInvitationDoc::new("GW1", "old@example.com", "CODE1", None, -1);
    invitations.create(&fresh).await.unwrap();
    invitations.create(&overdue).await.unwrap();

    // expired invitations are already invisible to resolution
    assert!(invitations.find_pending("old@example.com").await.unwrap().is_none());
    assert!(invitations.find_pending("fresh@example.com").await.unwrap().is_some());

    let expired = invitations.expire_overdue(Utc::now()).await.unwrap();
    assert_eq!(expired, 1);

    // the sweep only voids overdue rows
    assert!(invitations.find_pending("fresh@example.com").await.unwrap().is_some());
}

struct FailingNotifier;

#[async_trait]
impl InvitationNotifier for FailingNotifier {
    async fn deliver(&self, _invitation: &ReferralInvitationDoc) -> EngineResult<()> {
        Err(EngineError::DeliveryFailed("smtp down".into()))
    }
}

#[tokio::test]
async fn test_delivery_failure_keeps_the_record() {
    let mem = Arc::new(MemoryStore::new());
    let store: Arc<dyn DocumentStore> = mem.clone();
    let progression = ProgressionEngine::new(Arc::clone(&store));
    let referral = ReferralEngine::new(Arc::clone(&store), Arc::new(FailingNotifier));

    let (referrer_id, _) = signup(&progression, &referral, "GFAILING01", None).await;

    let result = referral
        .send_referral_invitation(&referrer_id, "friend@example.com", None)
        .await;
    assert!(matches!(result, Err(EngineError::DeliveryFailed(_))));

    // the invitation row survives, marked failed, and is no longer
    // resolvable as pending
    assert_eq!(mem.len("referral_invitations").await, 1);
    let invitations = InvitationStore::new(store);
    assert!(invitations
        .find_pending("friend@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_invitation_requires_code_and_valid_email() {
    let (_, progression, referral) = setup();

    // no referral code assigned yet
    let bare = progression.create_account("GNOCODE001").await.unwrap();
    assert!(matches!(
        referral
            .send_referral_invitation(&bare.id, "friend@example.com", None)
            .await,
        Err(EngineError::MissingReferralCode)
    ));

    let (referrer_id, _) = signup(&progression, &referral, "GHASCODE01", None).await;
    assert!(matches!(
        referral
            .send_referral_invitation(&referrer_id, "not-an-email", None)
            .await,
        Err(EngineError::InvalidEmail)
    ));
}

#[tokio::test]
async fn test_social_quests_and_quest_master() {
    let (_, progression, referral) = setup();

    let (account_id, code) = signup(&progression, &referral, "GMASTER001", None).await;

    let outcome = referral
        .complete_social_quest(&account_id, "join-community")
        .await
        .unwrap();
    assert!(outcome.grant.is_some());

    // completing the same quest again grants nothing
    let repeat = referral
        .complete_social_quest(&account_id, "join-community")
        .await
        .unwrap();
    assert!(repeat.grant.is_none());

    assert!(matches!(
        referral.complete_social_quest(&account_id, "refer-1-friend").await,
        Err(EngineError::UnknownQuest(_))
    ));

    referral
        .complete_social_quest(&account_id, "share-demo")
        .await
        .unwrap();

    for i in 0..10 {
        let wallet = format!("GCREW{i:05}");
        signup(&progression, &referral, &wallet, Some(&code)).await;
    }

    let view = progression.get_account(&account_id).await.unwrap();
    assert!(view.has_completed_quest("refer-10-friends"));
    assert!(view.has_badge_named("Quest Master"));
    assert_eq!(
        view.badges.iter().filter(|b| b.name == "Quest Master").count(),
        1
    );
}
