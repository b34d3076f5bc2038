use crate::domain_model::{Fingerprint, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Boundary error of the session lifecycle. Validation failures of every kind
/// collapse to `Unauthorized`; the cause is only logged.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature mismatch")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token malformed")]
    Malformed,
    #[error("token signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    #[error("stored hash is not a well-formed PHC string")]
    CorruptHash,
    #[error("hashing failed: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claim set carried by both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub fingerprint: Fingerprint,
    pub kind: TokenKind,
    pub jti: String,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

/// Signed compact form of a refresh token, as stored (hashed) and verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken(pub String);

/// Base64 transport form of a refresh token, as handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedRefreshToken(pub String);

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: EncodedRefreshToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
}

pub trait TokenCodec: Send + Sync {
    /// Sign a token of `kind` for `(user_id, fingerprint)` valid for `ttl`.
    fn issue(
        &self,
        user_id: &UserId,
        fingerprint: &Fingerprint,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), TokenError>;

    fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, TokenError>;

    fn issue_pair(
        &self,
        user_id: &UserId,
        fingerprint: &Fingerprint,
    ) -> Result<TokenPair, TokenError> {
        let (access, access_exp) =
            self.issue(user_id, fingerprint, TokenKind::Access, ACCESS_TOKEN_TTL)?;
        let (refresh, refresh_exp) =
            self.issue(user_id, fingerprint, TokenKind::Refresh, REFRESH_TOKEN_TTL)?;
        Ok(TokenPair {
            access_token: AccessToken(access),
            refresh_token: RefreshToken(refresh),
            access_token_expires_at: access_exp,
            refresh_token_expires_at: refresh_exp,
        })
    }
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash(&self, secret: &str) -> Result<String, HashError>;
    /// `Ok(false)` on mismatch; `Err(CorruptHash)` only when `hashed` is unparsable.
    async fn verify(&self, hashed: &str, candidate: &str) -> Result<bool, HashError>;
}

/// The session lifecycle manager. The only entry point for callers.
#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    async fn create_session(
        &self,
        user_id: &UserId,
        fingerprint: &Fingerprint,
    ) -> Result<AuthTokens, SessionError>;

    async fn rotate_session(&self, refresh_token: &str) -> Result<AuthTokens, SessionError>;

    async fn revoke_session(&self, refresh_token: &str) -> Result<(), SessionError>;

    /// Returns how many sessions were removed.
    async fn revoke_all_sessions(&self, refresh_token: &str) -> Result<u64, SessionError>;

    async fn verify_access(&self, access_token: &str) -> Result<TokenClaims, SessionError>;

    async fn purge_expired_sessions(&self) -> Result<u64, SessionError>;
}
