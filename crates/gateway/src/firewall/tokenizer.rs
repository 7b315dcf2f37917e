//! Session-scoped, bidirectional PII tokenizer store.
//!
//! Surrogates are deterministic given `(session_id, original)`: the same input in the same
//! session always maps to the same surrogate, without remembering having seen it before. This
//! lets the store be a bounded cache rather than a ledger - eviction only loses the ability to
//! reverse a surrogate quickly, not the mapping's determinism for freshly-seen input.

use std::time::Duration;

use mini_moka::sync::Cache;
use rand::{Rng, SeedableRng, rngs::StdRng};
use sha2::{Digest, Sha256};

use super::pii::PiiType;

const NAME_POOL: &[&str] = &[
    "Avery Stone",
    "Jordan Blake",
    "Morgan Reyes",
    "Casey Flint",
    "Riley Monroe",
    "Taylor Quinn",
    "Sydney Cole",
    "Drew Harlow",
];

/// A single reversible mapping produced by the tokenizer.
#[derive(Debug, Clone)]
pub(crate) struct TokenMapping {
    pub original: String,
    pub surrogate: String,
}

/// Bounded, TTL-limited bidirectional store keyed by session.
///
/// Forward and reverse lookups are held in separate caches rather than one bidirectional map
/// so each can be keyed (and evicted) independently by `(session, original)` and
/// `(session, surrogate)` respectively.
pub(crate) struct TokenizerStore {
    forward: Cache<(String, String), String>,
    reverse: Cache<(String, String), String>,
}

impl TokenizerStore {
    pub(crate) fn new(config: &config::TokenizerStoreConfig) -> Self {
        let build = |capacity: u64, ttl: Duration| Cache::builder().max_capacity(capacity).time_to_idle(ttl).build();

        Self {
            forward: build(config.max_capacity, config.ttl),
            reverse: build(config.max_capacity, config.ttl),
        }
    }

    /// Get or create the surrogate for `original` within `session_id`.
    pub(crate) fn surrogate_for(&self, session_id: &str, original: &str, kind: PiiType) -> String {
        let forward_key = (session_id.to_string(), original.to_string());

        if let Some(existing) = self.forward.get(&forward_key) {
            return existing;
        }

        let surrogate = generate_surrogate(session_id, original, kind);

        self.forward.insert(forward_key, surrogate.clone());
        self.reverse.insert((session_id.to_string(), surrogate.clone()), original.to_string());

        surrogate
    }

    /// Reverse a surrogate back to its original value, if it belongs to this session.
    pub(crate) fn reverse_lookup(&self, session_id: &str, surrogate: &str) -> Option<String> {
        self.reverse.get(&(session_id.to_string(), surrogate.to_string()))
    }

    /// All surrogates currently live for a session, longest first so a scanner can do
    /// longest-match-first replacement without overlapping shorter matches.
    pub(crate) fn active_surrogates(&self, session_id: &str) -> Vec<String> {
        let mut surrogates: Vec<String> = self
            .reverse
            .iter()
            .filter(|(key, _)| key.0 == session_id)
            .map(|(key, _)| key.1.clone())
            .collect();

        surrogates.sort_by_key(|s| std::cmp::Reverse(s.len()));
        surrogates
    }
}

fn seeded_rng(session_id: &str, original: &str) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update([0]);
    hasher.update(original.as_bytes());
    let digest = hasher.finalize();

    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    StdRng::from_seed(seed)
}

/// Produce a shape-preserving surrogate deterministic in `(session_id, original)`.
fn generate_surrogate(session_id: &str, original: &str, kind: PiiType) -> String {
    let mut rng = seeded_rng(session_id, original);

    match kind {
        PiiType::Email => {
            let handle: String = (0..8).map(|_| rng.random_range(b'a'..=b'z') as char).collect();
            format!("{handle}@redacted.local")
        }
        PiiType::Phone => {
            let digits: String = (0..6).map(|_| rng.random_range(b'0'..=b'9') as char).collect();
            format!("+1-555-{digits}")
        }
        PiiType::Ssn => {
            let digits: String = (0..4).map(|_| rng.random_range(b'0'..=b'9') as char).collect();
            format!("XXX-XX-{digits}")
        }
        PiiType::Person => NAME_POOL[rng.random_range(0..NAME_POOL.len())].to_string(),
        PiiType::CnIdCard => {
            let digits: String = (0..17).map(|_| rng.random_range(b'0'..=b'9') as char).collect();
            format!("{digits}X")
        }
        PiiType::Location => "Redacted City".to_string(),
        // Non-reversible types never reach the tokenizer; guard defensively with a generic shape.
        PiiType::CreditCard | PiiType::IpAddress | PiiType::ApiKey | PiiType::Passport => "[REDACTED]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TokenizerStore {
        TokenizerStore::new(&config::TokenizerStoreConfig {
            max_capacity: 1000,
            ttl: Duration::from_secs(3600),
        })
    }

    #[test]
    fn same_input_same_session_is_stable() {
        let store = store();
        let a = store.surrogate_for("session-1", "alice@example.com", PiiType::Email);
        let b = store.surrogate_for("session-1", "alice@example.com", PiiType::Email);
        assert_eq!(a, b);
    }

    #[test]
    fn different_sessions_get_different_surrogates() {
        let store = store();
        let a = store.surrogate_for("session-1", "alice@example.com", PiiType::Email);
        let b = store.surrogate_for("session-2", "alice@example.com", PiiType::Email);
        assert_ne!(a, b);
    }

    #[test]
    fn reverse_lookup_round_trips() {
        let store = store();
        let surrogate = store.surrogate_for("session-1", "alice@example.com", PiiType::Email);
        assert_eq!(
            store.reverse_lookup("session-1", &surrogate).as_deref(),
            Some("alice@example.com")
        );
    }

    #[test]
    fn reverse_lookup_is_scoped_to_session() {
        let store = store();
        let surrogate = store.surrogate_for("session-1", "alice@example.com", PiiType::Email);
        assert!(store.reverse_lookup("session-2", &surrogate).is_none());
    }
}
