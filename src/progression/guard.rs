//! Completion guards
//!
//! Two layers. [`CompletionGuard`] is a process-local set that stops the
//! same running client from double-submitting a completion while a
//! request is in flight; it protects nothing across devices or tabs.
//! [`CompletionClaims`] is the server-side idempotency record: one claim
//! per (account, demo, attempt), inserted before the reward write
//! sequence, so concurrent sessions and ambiguous-failure retries cannot
//! both own the same completion.

use std::sync::Arc;

use dashmap::DashSet;
use serde_json::to_value;

use crate::db::schemas::{CompletionClaimDoc, CLAIM_COLLECTION};
use crate::db::DocumentStore;
use crate::types::{EngineError, Result};

/// Process-local in-flight completion set
#[derive(Clone, Default)]
pub struct CompletionGuard {
    in_flight: Arc<DashSet<String>>,
}

impl CompletionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to mark a completion in flight. Returns a ticket that
    /// releases the key when dropped, success or failure.
    pub fn try_acquire(&self, account_id: &str, demo_slug: &str) -> Option<CompletionTicket> {
        let key = format!("{account_id}:{demo_slug}");
        if self.in_flight.insert(key.clone()) {
            Some(CompletionTicket {
                in_flight: Arc::clone(&self.in_flight),
                key,
            })
        } else {
            None
        }
    }
}

/// RAII release of an in-flight completion key
pub struct CompletionTicket {
    in_flight: Arc<DashSet<String>>,
    key: String,
}

impl Drop for CompletionTicket {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

/// Durable completion claims keyed by (account, demo, attempt)
#[derive(Clone)]
pub struct CompletionClaims {
    store: Arc<dyn DocumentStore>,
}

impl CompletionClaims {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Claim a completion attempt; false when another session owns it
    pub async fn try_claim(&self, account_id: &str, demo_slug: &str, attempt: i64) -> Result<bool> {
        let claim = CompletionClaimDoc::new(account_id, demo_slug, attempt);
        let value = to_value(&claim)
            .map_err(|e| EngineError::Internal(format!("claim serialization failed: {}", e)))?;

        self.store
            .create_if_absent(CLAIM_COLLECTION, &claim.id, value)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_blocks_while_held() {
        let guard = CompletionGuard::new();

        let ticket = guard.try_acquire("a1", "hello-escrow");
        assert!(ticket.is_some());
        assert!(guard.try_acquire("a1", "hello-escrow").is_none());

        // a different demo for the same account is independent
        assert!(guard.try_acquire("a1", "create-escrow").is_some());

        drop(ticket);
        assert!(guard.try_acquire("a1", "hello-escrow").is_some());
    }
}
