use super::transport::{decode_transport, encode_transport};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::{SessionStore, StoreError, UserRepo};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Session lifecycle manager: create, rotate, revoke and revoke-all.
///
/// Holds no mutable state of its own; everything lives in the session store.
pub struct RealSessionService {
    user_repo: Arc<dyn UserRepo>,
    session_store: Arc<dyn SessionStore>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
}

/// A refresh token that passed signature, expiry and stored-hash checks.
struct ValidatedSession {
    claims: TokenClaims,
    session: Session,
}

impl RealSessionService {
    pub fn new(
        user_repo: Arc<dyn UserRepo>,
        session_store: Arc<dyn SessionStore>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
    ) -> Self {
        Self {
            user_repo,
            session_store,
            credential_hasher,
            token_codec,
        }
    }

    fn store_failure(op: &'static str, e: StoreError) -> SessionError {
        match e {
            StoreError::NotFound | StoreError::Conflict => {
                debug!(op, cause = %e, "session rejected");
                SessionError::Unauthorized
            }
            StoreError::Unavailable(msg) => {
                warn!(op, %msg, "session store unavailable");
                SessionError::StoreUnavailable(msg)
            }
        }
    }

    fn token_failure(op: &'static str, e: TokenError) -> SessionError {
        match e {
            TokenError::Signing(msg) => {
                error!(op, %msg, "token signing failed");
                SessionError::InternalError(msg)
            }
            other => {
                debug!(op, cause = %other, "token rejected");
                SessionError::Unauthorized
            }
        }
    }

    /// Transport decode plus signature/expiry check.
    fn authenticate(
        &self,
        op: &'static str,
        encoded: &str,
    ) -> Result<(RefreshToken, TokenClaims), SessionError> {
        let token = decode_transport(encoded).map_err(|e| Self::token_failure(op, e))?;
        let claims = self
            .token_codec
            .verify(&token.0, TokenKind::Refresh)
            .map_err(|e| Self::token_failure(op, e))?;
        Ok((token, claims))
    }

    /// Full validation: `authenticate`, then lookup by `(user, fingerprint)`
    /// and comparison against the stored hash.
    async fn validate(
        &self,
        op: &'static str,
        encoded: &str,
    ) -> Result<ValidatedSession, SessionError> {
        let (token, claims) = self.authenticate(op, encoded)?;

        let session = self
            .session_store
            .find_by_user_and_fingerprint(&claims.user_id, &claims.fingerprint)
            .await
            .map_err(|e| Self::store_failure(op, e))?;

        if session.is_expired_at(Utc::now()) {
            debug!(op, session_id = %session.id, "stored session expired");
            return Err(SessionError::Unauthorized);
        }

        match self
            .credential_hasher
            .verify(&session.hashed_refresh_token, &token.0)
            .await
        {
            Ok(true) => Ok(ValidatedSession { claims, session }),
            Ok(false) => {
                warn!(
                    op,
                    session_id = %session.id,
                    user_id = %claims.user_id,
                    "refresh token does not match stored session"
                );
                Err(SessionError::Unauthorized)
            }
            Err(HashError::CorruptHash) => {
                error!(op, session_id = %session.id, "stored refresh hash is corrupt");
                Err(SessionError::Unauthorized)
            }
            Err(HashError::InternalError(msg)) => Err(SessionError::InternalError(msg)),
        }
    }

    /// Issue a pair and hash its refresh token. Nothing is persisted here.
    async fn mint(
        &self,
        user_id: &UserId,
        fingerprint: &Fingerprint,
    ) -> Result<(TokenPair, NewSession), SessionError> {
        let pair = self
            .token_codec
            .issue_pair(user_id, fingerprint)
            .map_err(|e| Self::token_failure("mint", e))?;

        let hashed_refresh_token = self
            .credential_hasher
            .hash(&pair.refresh_token.0)
            .await
            .map_err(|e| SessionError::InternalError(e.to_string()))?;

        let new_session = NewSession {
            user_id: user_id.clone(),
            hashed_refresh_token,
            fingerprint: fingerprint.clone(),
            expires_at: pair.refresh_token_expires_at,
        };
        Ok((pair, new_session))
    }

    fn for_transport(pair: TokenPair) -> AuthTokens {
        AuthTokens {
            refresh_token: encode_transport(&pair.refresh_token),
            access_token: pair.access_token,
            access_token_expires_at: pair.access_token_expires_at,
            refresh_token_expires_at: pair.refresh_token_expires_at,
        }
    }
}

#[async_trait::async_trait]
impl SessionService for RealSessionService {
    async fn create_session(
        &self,
        user_id: &UserId,
        fingerprint: &Fingerprint,
    ) -> Result<AuthTokens, SessionError> {
        let exists = self
            .user_repo
            .id_exists(user_id)
            .await
            .map_err(|e| Self::store_failure("create", e))?;
        if !exists {
            debug!(%user_id, "session requested for unknown user");
            return Err(SessionError::Unauthorized);
        }

        let (pair, new_session) = self.mint(user_id, fingerprint).await?;
        let session_id = self
            .session_store
            .insert(new_session)
            .await
            .map_err(|e| Self::store_failure("create", e))?;

        info!(%user_id, %fingerprint, %session_id, "session created");
        Ok(Self::for_transport(pair))
    }

    async fn rotate_session(&self, refresh_token: &str) -> Result<AuthTokens, SessionError> {
        let ValidatedSession { claims, session } = self.validate("rotate", refresh_token).await?;

        // Hash before touching the store so the transaction stays short.
        let (pair, new_session) = self.mint(&claims.user_id, &claims.fingerprint).await?;

        // Delete and insert commit together; a concurrent rotation of the
        // same session finds it gone and gets NotFound.
        let session_id = self
            .session_store
            .replace(session.id, new_session)
            .await
            .map_err(|e| Self::store_failure("rotate", e))?;

        info!(
            user_id = %claims.user_id,
            old_session_id = %session.id,
            %session_id,
            "session rotated"
        );
        Ok(Self::for_transport(pair))
    }

    async fn revoke_session(&self, refresh_token: &str) -> Result<(), SessionError> {
        let ValidatedSession { claims, session } = self.validate("revoke", refresh_token).await?;

        self.session_store
            .delete_by_id(session.id)
            .await
            .map_err(|e| Self::store_failure("revoke", e))?;

        info!(user_id = %claims.user_id, session_id = %session.id, "session revoked");
        Ok(())
    }

    async fn revoke_all_sessions(&self, refresh_token: &str) -> Result<u64, SessionError> {
        // Signature and expiry only: any server-signed refresh token for the
        // user may log them out everywhere, even one already rotated out.
        let (_, claims) = self.authenticate("revoke_all", refresh_token)?;

        let removed = self
            .session_store
            .delete_all_by_user(&claims.user_id)
            .await
            .map_err(|e| Self::store_failure("revoke_all", e))?;

        info!(user_id = %claims.user_id, removed, "all sessions revoked");
        Ok(removed)
    }

    async fn verify_access(&self, access_token: &str) -> Result<TokenClaims, SessionError> {
        self.token_codec
            .verify(access_token, TokenKind::Access)
            .map_err(|e| Self::token_failure("verify_access", e))
    }

    async fn purge_expired_sessions(&self) -> Result<u64, SessionError> {
        let removed = self
            .session_store
            .purge_expired(Utc::now())
            .await
            .map_err(|e| Self::store_failure("purge", e))?;
        if removed > 0 {
            info!(removed, "expired sessions purged");
        }
        Ok(removed)
    }
}
