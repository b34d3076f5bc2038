use super::util::{bounded, epoch_string, map_sqlx, parse_epoch};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlConnection, MySqlPool, Row};
use std::time::Duration;

pub struct MySqlSessionStore {
    pool: MySqlPool,
    op_timeout: Duration,
}

impl MySqlSessionStore {
    pub fn new(pool: MySqlPool, op_timeout: Duration) -> Self {
        MySqlSessionStore { pool, op_timeout }
    }

    fn row_to_session(row: MySqlRow) -> Result<Session, StoreError> {
        let get = |e: sqlx::Error| StoreError::Unavailable(e.to_string());

        let id: uuid::Uuid = row.try_get("id").map_err(get)?;
        let user_id: String = row.try_get("user_id").map_err(get)?;
        let hashed_refresh_token: String = row.try_get("refresh_token").map_err(get)?;
        let fingerprint: String = row.try_get("fingerprint").map_err(get)?;
        let expires_in: String = row.try_get("expires_in").map_err(get)?;
        let created_at: String = row.try_get("created_at").map_err(get)?;

        Ok(Session {
            id: SessionId(id),
            user_id: UserId(user_id),
            hashed_refresh_token,
            fingerprint: Fingerprint(fingerprint),
            expires_at: parse_epoch("expires_in", &expires_in)?,
            created_at: parse_epoch("created_at", &created_at)?,
        })
    }

    /// Insert `session` into an open transaction, first dropping any record
    /// for the same device.
    async fn put_in_tx(
        conn: &mut MySqlConnection,
        session: &NewSession,
    ) -> Result<SessionId, StoreError> {
        sqlx::query(
            r#"
DELETE FROM refresh_session
WHERE user_id = ? AND fingerprint = ?
"#,
        )
        .bind(&session.user_id)
        .bind(session.fingerprint.as_str())
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;

        let id = SessionId::new_random();
        sqlx::query(
            r#"
INSERT INTO refresh_session (id, user_id, refresh_token, fingerprint, expires_in, created_at)
VALUES (?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(id)
        .bind(&session.user_id)
        .bind(&session.hashed_refresh_token)
        .bind(session.fingerprint.as_str())
        .bind(epoch_string(session.expires_at))
        .bind(epoch_string(Utc::now()))
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;

        Ok(id)
    }
}

#[async_trait::async_trait]
impl SessionStore for MySqlSessionStore {
    async fn insert(&self, session: NewSession) -> Result<SessionId, StoreError> {
        bounded(self.op_timeout, "insert", async {
            let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
            let id = Self::put_in_tx(&mut tx, &session).await?;
            tx.commit().await.map_err(map_sqlx)?;
            Ok(id)
        })
        .await
    }

    async fn find_by_user_and_fingerprint(
        &self,
        user_id: &UserId,
        fingerprint: &Fingerprint,
    ) -> Result<Session, StoreError> {
        bounded(self.op_timeout, "find", async {
            let row_opt: Option<MySqlRow> = sqlx::query(
                r#"
SELECT id, user_id, refresh_token, fingerprint, expires_in, created_at
FROM refresh_session
WHERE user_id = ? AND fingerprint = ?
LIMIT 1
"#,
            )
            .bind(user_id)
            .bind(fingerprint.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

            row_opt
                .map(Self::row_to_session)
                .transpose()?
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn delete_by_id(&self, id: SessionId) -> Result<(), StoreError> {
        bounded(self.op_timeout, "delete_by_id", async {
            let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
            let res = sqlx::query("DELETE FROM refresh_session WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?;

            if res.rows_affected() == 0 {
                tx.rollback().await.map_err(map_sqlx)?;
                return Err(StoreError::NotFound);
            }
            tx.commit().await.map_err(map_sqlx)?;
            Ok(())
        })
        .await
    }

    async fn delete_all_by_user(&self, user_id: &UserId) -> Result<u64, StoreError> {
        bounded(self.op_timeout, "delete_all_by_user", async {
            let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
            let res = sqlx::query("DELETE FROM refresh_session WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?;

            let removed = res.rows_affected();
            if removed == 0 {
                tx.rollback().await.map_err(map_sqlx)?;
                return Err(StoreError::NotFound);
            }
            tx.commit().await.map_err(map_sqlx)?;
            Ok(removed)
        })
        .await
    }

    async fn replace(
        &self,
        old: SessionId,
        session: NewSession,
    ) -> Result<SessionId, StoreError> {
        bounded(self.op_timeout, "replace", async {
            let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

            // Row lock on `old` serializes concurrent rotations; the loser
            // sees zero affected rows.
            let res = sqlx::query("DELETE FROM refresh_session WHERE id = ?")
                .bind(old)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?;
            if res.rows_affected() == 0 {
                tx.rollback().await.map_err(map_sqlx)?;
                return Err(StoreError::NotFound);
            }

            let id = Self::put_in_tx(&mut tx, &session).await?;
            tx.commit().await.map_err(map_sqlx)?;
            Ok(id)
        })
        .await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        bounded(self.op_timeout, "purge_expired", async {
            let res = sqlx::query(
                r#"
DELETE FROM refresh_session
WHERE CAST(expires_in AS SIGNED) < ?
"#,
            )
            .bind(now.timestamp())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
            Ok(res.rows_affected())
        })
        .await
    }

    async fn count_for_user(&self, user_id: &UserId) -> Result<u64, StoreError> {
        bounded(self.op_timeout, "count_for_user", async {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM refresh_session WHERE user_id = ?")
                    .bind(user_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx)?;
            Ok(count as u64)
        })
        .await
    }
}

// Runs against a live server:
// SESSIONGATE_TEST_DATABASE_URL=mysql://root:pw@localhost:3306/sessiongate_test \
//   cargo test -- --ignored
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_mysql::ensure_schema;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    async fn store() -> MySqlSessionStore {
        let url = std::env::var("SESSIONGATE_TEST_DATABASE_URL")
            .expect("SESSIONGATE_TEST_DATABASE_URL must point at a scratch database");
        let pool = MySqlPool::connect(&url).await.unwrap();
        ensure_schema(&pool).await.unwrap();
        MySqlSessionStore::new(pool, Duration::from_secs(5))
    }

    fn unique_user() -> UserId {
        UserId::new_random()
    }

    fn new_session(user: &UserId, fp: &str, hash: &str) -> NewSession {
        NewSession {
            user_id: user.clone(),
            hashed_refresh_token: hash.to_string(),
            fingerprint: fp.into(),
            expires_at: Utc::now() + ChronoDuration::hours(24),
        }
    }

    #[tokio::test]
    #[ignore = "needs a MySQL server"]
    async fn insert_find_and_supersede() {
        let store = store().await;
        let user = unique_user();

        let first = store.insert(new_session(&user, "dev-A", "h1")).await.unwrap();
        let second = store.insert(new_session(&user, "dev-A", "h2")).await.unwrap();
        assert_ne!(first, second);

        let found = store
            .find_by_user_and_fingerprint(&user, &"dev-A".into())
            .await
            .unwrap();
        assert_eq!(found.id, second);
        assert_eq!(found.hashed_refresh_token, "h2");
        assert_eq!(store.count_for_user(&user).await.unwrap(), 1);
        assert!(matches!(
            store.delete_by_id(first).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    #[ignore = "needs a MySQL server"]
    async fn fingerprints_differing_in_case_are_distinct_devices() {
        let store = store().await;
        let user = unique_user();

        store.insert(new_session(&user, "dev-A", "upper")).await.unwrap();
        store.insert(new_session(&user, "dev-a", "lower")).await.unwrap();

        assert_eq!(store.count_for_user(&user).await.unwrap(), 2);
        let upper = store
            .find_by_user_and_fingerprint(&user, &"dev-A".into())
            .await
            .unwrap();
        assert_eq!(upper.hashed_refresh_token, "upper");
    }

    #[tokio::test]
    #[ignore = "needs a MySQL server"]
    async fn replace_is_single_shot() {
        let store = store().await;
        let user = unique_user();
        let old = store.insert(new_session(&user, "dev-A", "h1")).await.unwrap();

        let new = store
            .replace(old, new_session(&user, "dev-A", "h2"))
            .await
            .unwrap();
        assert!(matches!(
            store.replace(old, new_session(&user, "dev-A", "h3")).await,
            Err(StoreError::NotFound)
        ));

        let found = store
            .find_by_user_and_fingerprint(&user, &"dev-A".into())
            .await
            .unwrap();
        assert_eq!(found.id, new);
        assert_eq!(found.hashed_refresh_token, "h2");
    }

    #[tokio::test]
    #[ignore = "needs a MySQL server"]
    async fn concurrent_first_logins_leave_one_session() {
        let store = Arc::new(store().await);
        let user = unique_user();

        let (a, b) = tokio::join!(
            store.insert(new_session(&user, "dev-A", "a")),
            store.insert(new_session(&user, "dev-A", "b"))
        );
        for res in [&a, &b] {
            assert!(
                matches!(res, Ok(_) | Err(StoreError::Conflict)),
                "unexpected outcome {res:?}"
            );
        }
        assert!(a.is_ok() || b.is_ok());
        assert_eq!(store.count_for_user(&user).await.unwrap(), 1);
    }

    #[tokio::test]
    #[ignore = "needs a MySQL server"]
    async fn delete_all_and_purge() {
        let store = store().await;
        let user = unique_user();

        store.insert(new_session(&user, "dev-A", "h")).await.unwrap();
        let mut stale = new_session(&user, "dev-B", "h");
        stale.expires_at = Utc::now() - ChronoDuration::hours(1);
        store.insert(stale).await.unwrap();

        assert!(store.purge_expired(Utc::now()).await.unwrap() >= 1);
        assert_eq!(store.count_for_user(&user).await.unwrap(), 1);

        assert_eq!(store.delete_all_by_user(&user).await.unwrap(), 1);
        assert!(matches!(
            store.delete_all_by_user(&user).await,
            Err(StoreError::NotFound)
        ));
    }
}
