use crate::domain_model::UserId;

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn create_user(&self, request: SignupInput) -> Result<UserId, UserError>;
}
