use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    pub fn new_random() -> Self {
        SessionId(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-supplied device/browser identifier. Scopes sessions per device.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Longest fingerprint accepted, in bytes. Matches the store column.
    pub const MAX_LEN: usize = 255;

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty() && self.0.len() <= Self::MAX_LEN
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Fingerprint(s.to_string())
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Fingerprint(s)
    }
}

/// One active refresh-token grant. `hashed_refresh_token` is a PHC string,
/// never the token itself.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub hashed_refresh_token: String,
    pub fingerprint: Fingerprint,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A session record before the store has assigned it an id.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: UserId,
    pub hashed_refresh_token: String,
    pub fingerprint: Fingerprint,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_bounds() {
        assert!(Fingerprint::from("dev-A").is_well_formed());
        assert!(Fingerprint("x".repeat(Fingerprint::MAX_LEN)).is_well_formed());
        assert!(!Fingerprint("x".repeat(Fingerprint::MAX_LEN + 1)).is_well_formed());
        assert!(!Fingerprint::from("").is_well_formed());
        // Bytes, not chars: 128 two-byte chars exceed the column.
        assert!(!Fingerprint("é".repeat(128)).is_well_formed());
    }
}
