use super::util::{bounded, map_sqlx};
use crate::domain_model::*;
use crate::domain_port::*;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use std::time::Duration;

pub struct MySqlUserRepo {
    pool: MySqlPool,
    op_timeout: Duration,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool, op_timeout: Duration) -> Self {
        MySqlUserRepo { pool, op_timeout }
    }

    fn row_to_user(row: MySqlRow) -> Result<User, StoreError> {
        let get = |e: sqlx::Error| StoreError::Unavailable(e.to_string());
        Ok(User {
            user_id: UserId(row.try_get("user_id").map_err(get)?),
            email: row.try_get("email").map_err(get)?,
            password_hash: row.try_get("password").map_err(get)?,
        })
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        bounded(self.op_timeout, "create_user", async {
            sqlx::query(
                r#"
INSERT INTO app_user (user_id, email, password)
VALUES (?, ?, ?)
"#,
            )
            .bind(&user.user_id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
            Ok(())
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        bounded(self.op_timeout, "find_user_by_email", async {
            let row_opt: Option<MySqlRow> =
                sqlx::query("SELECT user_id, email, password FROM app_user WHERE email = ?")
                    .bind(email)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx)?;

            row_opt.map(Self::row_to_user).transpose()
        })
        .await
    }

    async fn id_exists(&self, user_id: &UserId) -> Result<bool, StoreError> {
        bounded(self.op_timeout, "user_id_exists", async {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM app_user WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx)?;
            Ok(count > 0)
        })
        .await
    }
}
