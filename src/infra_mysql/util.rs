use crate::domain_port::StoreError;
use sqlx::mysql::MySqlDatabaseError;
use std::future::Future;
use std::time::Duration;

const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
const ER_LOCK_DEADLOCK: u16 = 1213;
const ER_DUP_ENTRY: u16 = 1062;

fn mysql_error_number(err: &sqlx::Error) -> Option<u16> {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return Some(mysql_err.number());
        }
    }

    None
}

/// Two writers racing on the same key lose as `Conflict`: a duplicate
/// insert, an InnoDB deadlock victim, or a lock wait that gave up.
fn is_contention(number: u16) -> bool {
    matches!(number, ER_DUP_ENTRY | ER_LOCK_DEADLOCK | ER_LOCK_WAIT_TIMEOUT)
}

pub fn map_sqlx(err: sqlx::Error) -> StoreError {
    match mysql_error_number(&err) {
        Some(number) if is_contention(number) => StoreError::Conflict,
        _ => StoreError::Unavailable(err.to_string()),
    }
}

/// Run a store operation with a hard deadline; a timeout is reported as
/// `Unavailable` rather than left hanging.
pub async fn bounded<T, F>(limit: Duration, op: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(StoreError::Unavailable(format!(
            "{op} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}

pub fn epoch_string(at: chrono::DateTime<chrono::Utc>) -> String {
    at.timestamp().to_string()
}

pub fn parse_epoch(column: &str, raw: &str) -> Result<chrono::DateTime<chrono::Utc>, StoreError> {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| StoreError::Unavailable(format!("bad epoch in {column}: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_times_out_as_unavailable() {
        let res: Result<(), _> = bounded(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(res, Err(StoreError::Unavailable(msg)) if msg.contains("slow")));
    }

    #[test]
    fn lock_contention_counts_as_conflict() {
        assert!(is_contention(1062));
        assert!(is_contention(1213));
        assert!(is_contention(1205));
        assert!(!is_contention(1406)); // data too long
        assert!(!is_contention(2013)); // lost connection
    }

    #[test]
    fn non_database_errors_are_unavailable() {
        assert!(matches!(
            map_sqlx(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert_eq!(mysql_error_number(&sqlx::Error::RowNotFound), None);
    }

    #[test]
    fn epoch_round_trips_at_second_precision() {
        let at = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(epoch_string(at), "1700000000");
        assert_eq!(parse_epoch("expires_in", "1700000000").unwrap(), at);
        assert!(parse_epoch("expires_in", "soon").is_err());
    }
}
