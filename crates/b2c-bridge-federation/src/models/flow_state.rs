//! The `state` parameter carried through the provider round trip.

use rand::{distributions::Alphanumeric, Rng};

/// Length of the generated nonce.
pub const NONCE_LEN: usize = 16;

const DELIMITER: char = ':';

/// CSRF nonce plus the optional post-login redirect.
///
/// Serialized as `nonce:redirect` only when it crosses the provider boundary.
/// The nonce is not remembered server-side, so it only makes the value opaque;
/// it does not by itself prove the callback belongs to a login we started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowState {
    pub nonce: String,
    pub redirect: Option<String>,
}

impl FlowState {
    /// Build a state with a fresh random nonce.
    #[must_use]
    pub fn new(redirect: Option<String>) -> Self {
        Self {
            nonce: generate_nonce(),
            redirect: redirect.filter(|r| !r.is_empty()),
        }
    }

    /// Encode as `nonce:redirect`. A missing redirect encodes as `nonce:`.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}{DELIMITER}{}",
            self.nonce,
            self.redirect.as_deref().unwrap_or_default()
        )
    }

    /// Parse a received `state` value.
    ///
    /// Only the first `:` splits, so a redirect may itself contain `:`.
    /// Anything without a non-empty second segment means "no redirect".
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(DELIMITER) {
            Some((nonce, redirect)) => Self {
                nonce: nonce.to_string(),
                redirect: (!redirect.is_empty()).then(|| redirect.to_string()),
            },
            None => Self {
                nonce: raw.to_string(),
                redirect: None,
            },
        }
    }
}

/// Random alphanumeric identifier; unpredictable enough to defeat casual CSRF.
#[must_use]
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}
