//! Referral code generation
//!
//! Codes are a deterministic prefix (first six characters of the wallet,
//! upper-cased) plus a random six-character suffix. Uniqueness is
//! enforced by a bounded lookup-retry loop; with a 36^6 suffix space the
//! fallback after exhausted retries is effectively unreachable.

use rand::Rng;
use tracing::warn;

use crate::accounts::AccountStore;
use crate::types::Result;

const SUFFIX_LEN: usize = 6;
const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_CODE_ATTEMPTS: usize = 5;

/// One candidate code for a wallet
pub fn candidate(wallet: &str) -> String {
    let prefix: String = wallet.chars().take(6).collect::<String>().to_uppercase();

    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();

    format!("{prefix}{suffix}")
}

/// Generate a code not currently assigned to any account
pub(crate) async fn generate_unique(accounts: &AccountStore, wallet: &str) -> Result<String> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = candidate(wallet);
        if accounts.find_by_referral_code(&code).await?.is_none() {
            return Ok(code);
        }
        warn!(wallet = %wallet, "referral code collision, regenerating");
    }

    let code = candidate(wallet);
    warn!(
        wallet = %wallet,
        "referral code still colliding after {} attempts, using unchecked candidate",
        MAX_CODE_ATTEMPTS
    );
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_shape() {
        let code = candidate("gabc123wallet");
        assert_eq!(code.len(), 12);
        assert!(code.starts_with("GABC12"));
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_short_wallet_keeps_whole_prefix() {
        let code = candidate("abc");
        assert_eq!(code.len(), 3 + SUFFIX_LEN);
        assert!(code.starts_with("ABC"));
    }
}
