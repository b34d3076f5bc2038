use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryUserRepo {
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.user_id) || users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict);
        }
        users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn id_exists(&self, user_id: &UserId) -> Result<bool, StoreError> {
        Ok(self.users.read().await.contains_key(user_id))
    }
}
