// crates/barbot-broker/src/token.rs
// ============================================================================
// Module: Barbot Access Tokens
// Description: Caller-scoped connection tokens and the hub access key.
// Purpose: Gate websocket subscriptions and hub REST calls.
// Dependencies: barbot-core, base64, rand, subtle
// ============================================================================

//! ## Overview
//! [`TokenIssuer`] mints short-lived tokens bound to a caller and a channel.
//! Tokens are 32 random bytes, base64url-encoded without padding. Expired
//! entries are pruned on every issuance, so the table stays bounded by the
//! issue rate times the lifetime. [`AccessKey`] guards the service-to-service
//! REST endpoints and compares in constant time.
//! Security posture: tokens and keys are secrets and never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use barbot_core::CallerId;
use barbot_core::Channel;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;
/// Maximum live tokens held at once.
pub const MAX_LIVE_TOKENS: usize = 16_384;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Token validation and issuance failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Token was never issued or has been pruned.
    #[error("unknown access token")]
    Unknown,
    /// Token lifetime has elapsed.
    #[error("access token expired")]
    Expired,
    /// Token was issued for another channel.
    #[error("access token is not valid for channel {0}")]
    WrongChannel(Channel),
    /// Too many live tokens.
    #[error("too many live access tokens")]
    Capacity,
    /// Token table lock failed.
    #[error("token table unavailable")]
    Unavailable,
}

// ============================================================================
// SECTION: Token Issuer
// ============================================================================

/// Binding recorded for an issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Caller the token was issued to.
    pub caller: CallerId,
    /// Channel the token subscribes to.
    pub channel: Channel,
    /// Expiry, epoch milliseconds.
    pub expires_at_ms: i64,
}

/// Newly issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Opaque token text.
    pub token: String,
    /// Expiry, epoch milliseconds.
    pub expires_at_ms: i64,
}

/// Issues and validates connection tokens.
pub struct TokenIssuer {
    /// Token lifetime.
    ttl: Duration,
    /// Live tokens keyed by token text.
    tokens: Mutex<HashMap<String, TokenGrant>>,
}

impl TokenIssuer {
    /// Creates an issuer with the given token lifetime.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `caller` on `channel` using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the token table is full or unavailable.
    pub fn issue(&self, caller: &CallerId, channel: Channel) -> Result<IssuedToken, TokenError> {
        self.issue_at(caller, channel, unix_millis())
    }

    /// Issues a token as of `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the token table is full or unavailable.
    pub fn issue_at(
        &self,
        caller: &CallerId,
        channel: Channel,
        now_ms: i64,
    ) -> Result<IssuedToken, TokenError> {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at_ms = now_ms.saturating_add(ttl_ms);
        let mut bytes = [0_u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let mut tokens = self.tokens.lock().map_err(|_| TokenError::Unavailable)?;
        tokens.retain(|_, grant| grant.expires_at_ms > now_ms);
        if tokens.len() >= MAX_LIVE_TOKENS {
            return Err(TokenError::Capacity);
        }
        tokens.insert(
            token.clone(),
            TokenGrant {
                caller: caller.clone(),
                channel,
                expires_at_ms,
            },
        );
        drop(tokens);
        Ok(IssuedToken {
            token,
            expires_at_ms,
        })
    }

    /// Validates `token` for `channel` using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the token is unknown, expired, or bound to
    /// another channel.
    pub fn validate(&self, token: &str, channel: Channel) -> Result<TokenGrant, TokenError> {
        self.validate_at(token, channel, unix_millis())
    }

    /// Validates `token` for `channel` as of `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when the token is unknown, expired, or bound to
    /// another channel.
    pub fn validate_at(
        &self,
        token: &str,
        channel: Channel,
        now_ms: i64,
    ) -> Result<TokenGrant, TokenError> {
        let tokens = self.tokens.lock().map_err(|_| TokenError::Unavailable)?;
        let grant = tokens.get(token).cloned().ok_or(TokenError::Unknown)?;
        drop(tokens);
        if grant.expires_at_ms <= now_ms {
            return Err(TokenError::Expired);
        }
        if grant.channel != channel {
            return Err(TokenError::WrongChannel(channel));
        }
        Ok(grant)
    }

    /// Returns the number of tokens currently held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.lock().map_or(0, |tokens| tokens.len())
    }

    /// Returns true when no tokens are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").field("ttl", &self.ttl).field("live", &self.len()).finish()
    }
}

// ============================================================================
// SECTION: Access Key
// ============================================================================

/// Service key guarding the hub REST endpoints.
#[derive(Clone)]
pub struct AccessKey(String);

impl AccessKey {
    /// Wraps a configured key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key for outbound requests.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Compares `candidate` against the key in constant time.
    #[must_use]
    pub fn verify(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// Verifies an `Authorization` header value of the form `Bearer <key>`.
    #[must_use]
    pub fn verify_bearer(&self, header: Option<&str>) -> bool {
        header
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|candidate| self.verify(candidate.trim()))
    }
}

impl std::fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessKey(<redacted>)")
    }
}

/// Returns the current unix epoch in milliseconds.
pub(crate) fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
