use base64::prelude::*;
use chrono::{DateTime, TimeDelta, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::shared::constants::SHARE_LINK_TOKEN_BYTES;

/// Time-boxed read access for one user.
///
/// Grants are never removed; an expired grant stays on the record as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct UserGrant {
    pub id: Uuid,
    pub grantee_id: String,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserGrant {
    pub fn new(grantee_id: &str, now: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            grantee_id: grantee_id.to_string(),
            granted_at: now,
            expires_at,
        }
    }

    /// Permanent grants never lapse; others are live strictly before `expires_at`
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        still_valid(self.expires_at, now)
    }
}

/// Bearer link giving any authenticated user read access to one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ShareLink {
    pub id: Uuid,
    pub link_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl ShareLink {
    pub fn new(now: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            link_id: generate_link_token(),
            created_at: now,
            expires_at,
            is_active: true,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !still_valid(self.expires_at, now)
    }

    /// Active and not expired
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

fn still_valid(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.map_or(true, |expires_at| expires_at > now)
}

/// Unguessable url-safe link token: 256 bits from the OS RNG, base64url without padding
pub fn generate_link_token() -> String {
    let mut bytes = [0u8; SHARE_LINK_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Expiry for a grant or link created at `now`.
///
/// A positive `ttl_hours` yields `now + ttl_hours`; absent or non-positive
/// values mean the grant never expires.
pub fn expiry_from_ttl(now: DateTime<Utc>, ttl_hours: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    match ttl_hours {
        Some(hours) if hours > 0 => TimeDelta::try_hours(hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .map(Some)
            .ok_or_else(|| AppError::Validation("ttlHours is too large".to_string())),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_permanent_grant_is_always_live() {
        let now = Utc::now();
        let grant = UserGrant::new("user-b", now, None);
        assert!(grant.is_live(now + Duration::days(3650)));
    }

    #[test]
    fn test_grant_lapses_at_expiry_instant() {
        let now = Utc::now();
        let grant = UserGrant::new("user-b", now, Some(now + Duration::hours(1)));
        assert!(grant.is_live(now + Duration::minutes(59)));
        assert!(!grant.is_live(now + Duration::hours(1)));
        assert!(!grant.is_live(now + Duration::minutes(90)));
    }

    #[test]
    fn test_inactive_link_is_unusable_even_before_expiry() {
        let now = Utc::now();
        let mut link = ShareLink::new(now, None);
        assert!(link.is_usable(now));
        link.is_active = false;
        assert!(!link.is_usable(now));
        assert!(!link.is_expired(now));
    }

    #[test]
    fn test_link_tokens_are_long_and_distinct() {
        let a = generate_link_token();
        let b = generate_link_token();
        // 32 bytes in unpadded base64 is 43 characters
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_expiry_from_ttl() {
        let now = Utc::now();
        assert_eq!(expiry_from_ttl(now, None).unwrap(), None);
        assert_eq!(expiry_from_ttl(now, Some(0)).unwrap(), None);
        assert_eq!(expiry_from_ttl(now, Some(-4)).unwrap(), None);
        assert_eq!(
            expiry_from_ttl(now, Some(24)).unwrap(),
            Some(now + Duration::hours(24))
        );
        assert!(matches!(
            expiry_from_ttl(now, Some(i64::MAX)),
            Err(AppError::Validation(_))
        ));
    }
}
