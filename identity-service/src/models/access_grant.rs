use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Client access grant validity window.
pub const GRANT_TTL_DAYS: i64 = 7;

/// Time-bounded access credential binding a (client email, project) pair to
/// a token. At most one live grant per pair; a new grant replaces the token
/// and expiry.
#[derive(Debug, Clone, FromRow)]
pub struct AccessGrant {
    pub client_email: String,
    pub project_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl AccessGrant {
    pub fn new(client_email: String, project_id: Uuid, token: String) -> Self {
        let now = Utc::now();
        Self {
            client_email,
            project_id,
            token,
            expires_at: now + Duration::days(GRANT_TTL_DAYS),
            created_utc: now,
        }
    }

    /// Grants are never purged eagerly; validity is checked at use time.
    pub fn is_usable(&self) -> bool {
        Utc::now() < self.expires_at
    }
}
