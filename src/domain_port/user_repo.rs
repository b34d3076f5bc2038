use crate::domain_model::*;
use crate::domain_port::StoreError;

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// `Conflict` if the email is already registered.
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn id_exists(&self, user_id: &UserId) -> Result<bool, StoreError>;
}
