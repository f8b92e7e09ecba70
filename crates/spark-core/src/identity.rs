//! Anonymous-identity resolution.
//!
//! Every inbound call gets one stable identifier: the authenticated user id
//! when there is one, otherwise an anonymous token carried in a client-held
//! cookie. Tokens are minted on demand, and minting itself is rate limited
//! per network origin so a client cannot dodge its quota by discarding the
//! cookie and starting over.
//!
//! Tokens are format-validated only, not cryptographically verified: any
//! string of the right shape is accepted as an identity to rate-limit.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::QuotaError;
use crate::limiter::RateLimiter;
use crate::policy;

/// Prefix all minted anonymous tokens carry.
pub const ANON_TOKEN_PREFIX: &str = "anon_";

const ANON_TOKEN_HEX_LEN: usize = 32;

/// What the transport layer knows about an inbound call.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Authenticated user id, when a valid access token was presented.
    /// Pre-trusted; the resolver passes it through untouched.
    pub user_id: Option<Uuid>,
    /// Raw anonymous credential from the client-held cookie, if any.
    pub anon_credential: Option<String>,
    /// Network origin of the call (client IP); keys the issuance policy.
    pub network_origin: String,
}

/// Outcome of identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// The stable string quotas are tracked against.
    pub identifier: String,
    /// True when a fresh token was minted and the credential must be
    /// re-issued to the client.
    pub minted_new_credential: bool,
}

/// Derives one stable identifier per inbound call.
pub struct IdentityResolver {
    limiter: Arc<RateLimiter>,
}

impl IdentityResolver {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }

    /// Resolve the call to an identifier, minting an anonymous token when
    /// needed.
    ///
    /// An invalid credential format is not an error: it triggers a silent
    /// re-mint, subject to the per-origin issuance budget. Hitting that
    /// budget fails with [`QuotaError::TokenIssuanceLimitExceeded`].
    pub async fn resolve(&self, call: &CallContext) -> Result<ResolvedIdentity, QuotaError> {
        if let Some(user_id) = call.user_id {
            return Ok(ResolvedIdentity {
                identifier: user_id.to_string(),
                minted_new_credential: false,
            });
        }

        if let Some(credential) = call.anon_credential.as_deref() {
            if is_valid_anon_token(credential) {
                return Ok(ResolvedIdentity {
                    identifier: credential.to_string(),
                    minted_new_credential: false,
                });
            }
            tracing::debug!(
                origin = %call.network_origin,
                "anonymous credential failed format check, re-minting"
            );
        }

        let decision = self
            .limiter
            .check(policy::ANON_TOKEN_ISSUE.name, &call.network_origin)
            .await?;

        if !decision.allowed {
            tracing::warn!(
                origin = %call.network_origin,
                reset_time_ms = decision.reset_time_ms,
                "anonymous token issuance limit reached"
            );
            let err = self.limiter.build_limit_error(&decision);
            return Err(QuotaError::TokenIssuanceLimitExceeded(err));
        }

        Ok(ResolvedIdentity {
            identifier: mint_anon_token(),
            minted_new_credential: true,
        })
    }
}

/// Mint an opaque random token: `anon_` followed by 32 lowercase hex chars.
pub fn mint_anon_token() -> String {
    format!("{ANON_TOKEN_PREFIX}{}", Uuid::new_v4().simple())
}

/// Shape check for tokens this system issues.
pub fn is_valid_anon_token(candidate: &str) -> bool {
    match candidate.strip_prefix(ANON_TOKEN_PREFIX) {
        Some(rest) => {
            rest.len() == ANON_TOKEN_HEX_LEN
                && rest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        }
        None => false,
    }
}
