use crate::domain_port::StoreError;
use super::util::map_sqlx;
use sqlx::MySqlPool;
use tracing::info;

const CREATE_APP_USER: &str = r#"
CREATE TABLE IF NOT EXISTS app_user (
    user_id  VARCHAR(64)  CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL PRIMARY KEY,
    email    VARCHAR(320) NOT NULL,
    password VARCHAR(255) NOT NULL,
    UNIQUE KEY uq_app_user_email (email)
)
"#;

// `expires_in` and `created_at` hold epoch seconds as strings. `user_id` and
// `fingerprint` compare byte-for-byte: `dev-A` and `dev-a` are two devices.
const CREATE_REFRESH_SESSION: &str = r#"
CREATE TABLE IF NOT EXISTS refresh_session (
    id            BINARY(16)   NOT NULL PRIMARY KEY,
    user_id       VARCHAR(64)  CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
    refresh_token VARCHAR(255) NOT NULL,
    fingerprint   VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
    expires_in    VARCHAR(20)  NOT NULL,
    created_at    VARCHAR(20)  NOT NULL,
    UNIQUE KEY uq_refresh_session_device (user_id, fingerprint),
    KEY ix_refresh_session_user (user_id)
)
"#;

pub async fn ensure_schema(pool: &MySqlPool) -> Result<(), StoreError> {
    for ddl in [CREATE_APP_USER, CREATE_REFRESH_SESSION] {
        sqlx::query(ddl).execute(pool).await.map_err(map_sqlx)?;
    }
    info!("mysql schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column<'a>(ddl: &'a str, name: &str) -> &'a str {
        ddl.lines()
            .map(str::trim)
            .find(|line| line.starts_with(name))
            .unwrap()
    }

    #[test]
    fn identity_columns_use_binary_collation() {
        for name in ["user_id ", "fingerprint "] {
            assert!(
                column(CREATE_REFRESH_SESSION, name).contains("COLLATE utf8mb4_bin"),
                "{name}"
            );
        }
        assert!(column(CREATE_APP_USER, "user_id ").contains("COLLATE utf8mb4_bin"));
        assert!(CREATE_REFRESH_SESSION.contains("UNIQUE KEY uq_refresh_session_device (user_id, fingerprint)"));
    }

    #[test]
    fn fingerprint_column_fits_the_accepted_length() {
        let width = format!("VARCHAR({})", crate::domain_model::Fingerprint::MAX_LEN);
        assert!(column(CREATE_REFRESH_SESSION, "fingerprint ").contains(&width));
    }
}
