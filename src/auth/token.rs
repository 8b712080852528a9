use std::sync::Arc;

use axum::extract::FromRef;
use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::repo::{SessionToken, TokenRepo, User, UserRepo};
use crate::state::AppState;

const TOKEN_BYTES: usize = 32;
const MAX_ISSUE_ATTEMPTS: u32 = 3;

/// 256 bits from the OS CSPRNG, hex-encoded to 64 lowercase characters.
pub fn generate_token_value() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .fold(String::with_capacity(TOKEN_BYTES * 2), |mut acc, b| {
            use std::fmt::Write;
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

fn looks_like_token(raw: &str) -> bool {
    raw.len() == TOKEN_BYTES * 2 && raw.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Session token store: issues, resolves, and revokes opaque bearer tokens.
///
/// Issuance and validity checks share one time source
/// (`OffsetDateTime::now_utc`), so a token's lifetime is unambiguous.
#[derive(Clone)]
pub struct SessionTokens {
    tokens: Arc<dyn TokenRepo>,
    users: Arc<dyn UserRepo>,
    ttl: Duration,
}

impl FromRef<AppState> for SessionTokens {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.tokens.clone(),
            state.users.clone(),
            Duration::days(state.config.auth.token_ttl_days),
        )
    }
}

impl SessionTokens {
    pub fn new(tokens: Arc<dyn TokenRepo>, users: Arc<dyn UserRepo>, ttl: Duration) -> Self {
        Self { tokens, users, ttl }
    }

    /// Issue a fresh token for `user_id`, expiring `ttl` from now.
    /// Regenerates on a token-value collision with the unique constraint.
    pub async fn issue(&self, user_id: Uuid) -> anyhow::Result<SessionToken> {
        let expires_at = OffsetDateTime::now_utc() + self.ttl;
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let value = generate_token_value();
            if let Some(token) = self.tokens.insert(user_id, &value, expires_at).await? {
                debug!(user_id = %user_id, "session token issued");
                return Ok(token);
            }
            warn!(user_id = %user_id, "token value collision, regenerating");
        }
        anyhow::bail!("failed to generate a unique session token")
    }

    /// Resolve a raw bearer value to its owner.
    ///
    /// Returns `None` uniformly for malformed, unknown, revoked, or expired
    /// tokens and for tokens whose owner is inactive; callers cannot tell the
    /// causes apart. Logs distinguish them at debug level.
    pub async fn resolve(&self, raw: &str) -> anyhow::Result<Option<(User, SessionToken)>> {
        if !looks_like_token(raw) {
            debug!("bearer value is not a session token");
            return Ok(None);
        }
        let Some(token) = self.tokens.find_active(raw).await? else {
            debug!("unknown or revoked token");
            return Ok(None);
        };
        if !token.is_usable_at(OffsetDateTime::now_utc()) {
            debug!(user_id = %token.user_id, "expired token");
            return Ok(None);
        }
        let Some(user) = self.users.find_by_id(token.user_id).await? else {
            debug!(user_id = %token.user_id, "token owner not found");
            return Ok(None);
        };
        if !user.is_active {
            debug!(user_id = %user.id, "token owner is inactive");
            return Ok(None);
        }
        Ok(Some((user, token)))
    }

    /// Revoke one token iff it belongs to `user_id`. A missing or foreign
    /// token is a silent no-op; logout never fails.
    pub async fn revoke(&self, raw: &str, user_id: Uuid) -> anyhow::Result<()> {
        let affected = self.tokens.deactivate(raw, user_id).await?;
        if affected == 0 {
            debug!(user_id = %user_id, "revoke matched no token");
        }
        Ok(())
    }

    /// Revoke every token owned by `user_id` (account deactivation cascade).
    pub async fn revoke_all(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let affected = self.tokens.deactivate_all(user_id).await?;
        debug!(user_id = %user_id, affected, "revoked all tokens");
        Ok(affected)
    }
}
