//! Referral invitations: storage adapter and delivery
//!
//! The invitation record is persisted before delivery is attempted, so
//! a failed send still leaves an auditable row. Delivery goes through
//! the [`InvitationNotifier`] seam; production posts to a notification
//! webhook, dev and tests log locally.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use crate::db::schemas::{InvitationStatus, ReferralInvitationDoc, INVITATION_COLLECTION};
use crate::db::{Condition, DocumentStore, Update};
use crate::types::{EngineError, Result};

/// Typed adapter over the `referral_invitations` collection
#[derive(Clone)]
pub struct InvitationStore {
    store: Arc<dyn DocumentStore>,
}

fn decode(value: serde_json::Value) -> Result<ReferralInvitationDoc> {
    serde_json::from_value(value)
        .map_err(|e| EngineError::Internal(format!("malformed invitation document: {}", e)))
}

impl InvitationStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Persist a new invitation
    pub async fn create(&self, invitation: &ReferralInvitationDoc) -> Result<()> {
        let value = serde_json::to_value(invitation).map_err(|e| {
            EngineError::Internal(format!("invitation serialization failed: {}", e))
        })?;
        self.store
            .create_or_replace(INVITATION_COLLECTION, &invitation.id, value)
            .await
    }

    /// Pending (sent, unexpired) invitation for an email, if any
    pub async fn find_pending(&self, email: &str) -> Result<Option<ReferralInvitationDoc>> {
        let now = Utc::now();
        let sent = self
            .store
            .query(
                INVITATION_COLLECTION,
                &[
                    ("email".to_string(), Condition::Eq(json!(email))),
                    (
                        "status".to_string(),
                        Condition::Eq(json!(InvitationStatus::Sent.as_str())),
                    ),
                ],
            )
            .await?;

        for value in sent {
            let invitation = decode(value)?;
            // expired invitations are void: skipped, never resolved
            if !invitation.is_expired(now) {
                return Ok(Some(invitation));
            }
        }
        Ok(None)
    }

    /// Completed invitations sent by a referrer
    pub async fn completed_for(&self, referrer_wallet: &str) -> Result<Vec<ReferralInvitationDoc>> {
        self.store
            .query(
                INVITATION_COLLECTION,
                &[
                    (
                        "referrer_wallet".to_string(),
                        Condition::Eq(json!(referrer_wallet)),
                    ),
                    (
                        "status".to_string(),
                        Condition::Eq(json!(InvitationStatus::Completed.as_str())),
                    ),
                ],
            )
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    async fn set_status(&self, id: &str, status: InvitationStatus) -> Result<()> {
        let update = Update::new()
            .set("status", json!(status.as_str()))
            .set("metadata.updated_at", json!(Utc::now()));
        self.store
            .partial_update(INVITATION_COLLECTION, id, update)
            .await
    }

    /// Mark an invitation completed (the invited email created an account)
    pub async fn mark_completed(&self, id: &str) -> Result<()> {
        debug!(invitation = %id, "invitation completed");
        self.set_status(id, InvitationStatus::Completed).await
    }

    /// Mark an invitation failed; the record is kept for audit
    pub async fn mark_failed(&self, id: &str) -> Result<()> {
        self.set_status(id, InvitationStatus::Failed).await
    }

    /// Void every sent invitation past its expiry; returns the count
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let sent = self
            .store
            .query(
                INVITATION_COLLECTION,
                &[(
                    "status".to_string(),
                    Condition::Eq(json!(InvitationStatus::Sent.as_str())),
                )],
            )
            .await?;

        let mut expired = 0;
        for value in sent {
            let invitation = decode(value)?;
            if invitation.is_expired(now) {
                self.mark_failed(&invitation.id).await?;
                expired += 1;
            }
        }

        Ok(expired)
    }
}

/// Delivery seam for invitation emails
#[async_trait]
pub trait InvitationNotifier: Send + Sync {
    async fn deliver(&self, invitation: &ReferralInvitationDoc) -> Result<()>;
}

/// Logs the invitation instead of delivering it (dev mode, tests)
pub struct LogNotifier;

#[async_trait]
impl InvitationNotifier for LogNotifier {
    async fn deliver(&self, invitation: &ReferralInvitationDoc) -> Result<()> {
        info!(
            email = %invitation.email,
            code = %invitation.referral_code,
            "invitation delivery (log only)"
        );
        Ok(())
    }
}

/// Posts invitations to a notification webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl InvitationNotifier for WebhookNotifier {
    async fn deliver(&self, invitation: &ReferralInvitationDoc) -> Result<()> {
        let payload = json!({
            "invitation_id": invitation.id,
            "email": invitation.email,
            "referral_code": invitation.referral_code,
            "message": invitation.message,
            "expires_at": invitation.expires_at,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EngineError::DeliveryFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::DeliveryFailed(format!(
                "notification service returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
