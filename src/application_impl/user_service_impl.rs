use crate::application_port::{CredentialHasher, SignupInput, UserError, UserService};
use crate::domain_model::{User, UserId};
use crate::domain_port::{StoreError, UserRepo};
use std::sync::Arc;
use tracing::info;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
    password_hasher: Arc<dyn CredentialHasher>,
    min_password_len: usize,
}

impl RealUserService {
    pub fn new(user_repo: Arc<dyn UserRepo>, password_hasher: Arc<dyn CredentialHasher>) -> Self {
        RealUserService {
            user_repo,
            password_hasher,
            min_password_len: 6,
        }
    }

    fn validate_signup(&self, email: &str, password: &str) -> Result<(), UserError> {
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
        if !well_formed {
            return Err(UserError::InvalidInput("email is not valid".to_string()));
        }
        if password.len() < self.min_password_len {
            return Err(UserError::InvalidInput("password too short".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn create_user(&self, request: SignupInput) -> Result<UserId, UserError> {
        let SignupInput { email, password } = request;
        let email = email.trim().to_lowercase();

        self.validate_signup(&email, &password)?;

        if self
            .user_repo
            .find_by_email(&email)
            .await
            .map_err(|e| UserError::Store(e.to_string()))?
            .is_some()
        {
            return Err(UserError::EmailTaken);
        }

        let password_hash = self
            .password_hasher
            .hash(&password)
            .await
            .map_err(|e| UserError::InternalError(e.to_string()))?;

        let user = User {
            user_id: UserId::new_random(),
            email,
            password_hash,
        };
        self.user_repo.create(&user).await.map_err(|e| match e {
            StoreError::Conflict => UserError::EmailTaken,
            other => UserError::Store(other.to_string()),
        })?;

        info!(user_id = %user.user_id, "user created");
        Ok(user.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::credential_hasher_argon2::cheap_hasher;
    use crate::infra_memory::MemoryUserRepo;

    fn service() -> (RealUserService, Arc<MemoryUserRepo>) {
        let repo = Arc::new(MemoryUserRepo::new());
        (
            RealUserService::new(repo.clone(), Arc::new(cheap_hasher())),
            repo,
        )
    }

    #[tokio::test]
    async fn stores_hashed_password() {
        let (service, repo) = service();
        let id = service
            .create_user(SignupInput {
                email: "Alice@Example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        assert!(repo.id_exists(&id).await.unwrap());
        let user = repo.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_ne!(user.password_hash, "correct horse");
        assert!(cheap_hasher()
            .verify(&user.password_hash, "correct horse")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let (service, _) = service();
        let input = SignupInput {
            email: "bob@example.com".to_string(),
            password: "hunter22".to_string(),
        };
        service.create_user(input.clone()).await.unwrap();
        assert!(matches!(
            service.create_user(input).await,
            Err(UserError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn bad_input_is_rejected() {
        let (service, _) = service();
        for (email, password) in [("no-at-sign", "longenough"), ("a@b", "short"), ("@b", "longenough")] {
            let res = service
                .create_user(SignupInput {
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await;
            assert!(matches!(res, Err(UserError::InvalidInput(_))), "{email}");
        }
    }
}
