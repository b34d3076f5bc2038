use crate::application_port::{CredentialHasher, HashError};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use serde::Deserialize;

/// Argon2id work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HasherConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl HasherConfig {
    /// OWASP minimum. Refresh tokens are already high-entropy.
    pub const fn for_refresh_tokens() -> Self {
        HasherConfig {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }

    pub const fn for_passwords() -> Self {
        HasherConfig {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 1,
        }
    }
}

pub struct Argon2CredentialHasher {
    params: Params,
}

impl Argon2CredentialHasher {
    pub fn new(cfg: HasherConfig) -> Result<Self, HashError> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| HashError::InternalError(format!("invalid argon2 params: {e}")))?;
        Ok(Argon2CredentialHasher { params })
    }

    fn hash_blocking(params: Params, secret: &[u8]) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let hash = argon2
            .hash_password(secret, &salt)
            .map_err(|e| HashError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    fn verify_blocking(hashed: &str, candidate: &[u8]) -> Result<bool, HashError> {
        let parsed = PasswordHash::new(hashed).map_err(|_| HashError::CorruptHash)?;

        // Params come from the PHC string, so older work factors still verify.
        match Argon2::default().verify_password(candidate, &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Err(HashError::CorruptHash),
        }
    }
}

#[async_trait::async_trait]
impl CredentialHasher for Argon2CredentialHasher {
    async fn hash(&self, secret: &str) -> Result<String, HashError> {
        let params = self.params.clone();
        let secret = secret.to_owned();
        tokio::task::spawn_blocking(move || Self::hash_blocking(params, secret.as_bytes()))
            .await
            .map_err(|e| HashError::InternalError(format!("hash task failed: {e}")))?
    }

    async fn verify(&self, hashed: &str, candidate: &str) -> Result<bool, HashError> {
        let hashed = hashed.to_owned();
        let candidate = candidate.to_owned();
        tokio::task::spawn_blocking(move || Self::verify_blocking(&hashed, candidate.as_bytes()))
            .await
            .map_err(|e| HashError::InternalError(format!("verify task failed: {e}")))?
    }
}

#[cfg(test)]
pub(crate) fn cheap_hasher() -> Argon2CredentialHasher {
    Argon2CredentialHasher::new(HasherConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}
