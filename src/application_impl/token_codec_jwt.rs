use crate::application_port::*;
use crate::domain_model::{Fingerprint, UserId};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;
use std::time::Duration;

/// Shortest signing secret accepted for HS512.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

#[derive(Clone)]
pub struct TokenConfig {
    pub signing_key: Vec<u8>,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

pub struct JwtHs512Codec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs512Codec {
    pub fn new(cfg: TokenConfig) -> Result<Self, TokenError> {
        if cfg.signing_key.len() < MIN_SIGNING_KEY_LEN {
            return Err(TokenError::Signing(format!(
                "signing key must be at least {MIN_SIGNING_KEY_LEN} bytes"
            )));
        }

        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Ok(JwtHs512Codec {
            encoding_key: EncodingKey::from_secret(&cfg.signing_key),
            decoding_key: DecodingKey::from_secret(&cfg.signing_key),
            validation,
        })
    }

    /// Sign an explicit claim set as-is.
    pub fn sign_claims(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS512), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

impl TokenCodec for JwtHs512Codec {
    fn issue(
        &self,
        user_id: &UserId,
        fingerprint: &Fingerprint,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), TokenError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| TokenError::Signing(e.to_string()))?;
        let iat_dt = Utc::now();
        let exp_dt = iat_dt + ttl;
        let claims = TokenClaims {
            user_id: user_id.clone(),
            fingerprint: fingerprint.clone(),
            kind,
            jti: Self::gen_jti(),
            issued_at: iat_dt.timestamp(),
            expires_at: exp_dt.timestamp(),
        };
        let token = self.sign_claims(&claims)?;
        Ok((token, exp_dt))
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            },
        )?;

        if data.claims.kind != kind {
            return Err(TokenError::Malformed);
        }
        Ok(data.claims)
    }
}
