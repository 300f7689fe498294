use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Reset token validity window.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;

/// Server-side half of a password-reset token. Only the digest is stored;
/// the raw secret is handed to the mailer exactly once.
#[derive(Debug, Clone, FromRow)]
pub struct ResetToken {
    pub identity_id: Uuid,
    pub token_digest: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub created_utc: DateTime<Utc>,
}

impl ResetToken {
    pub fn new(identity_id: Uuid, token_digest: String) -> Self {
        let now = Utc::now();
        Self {
            identity_id,
            token_digest,
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
            consumed: false,
            created_utc: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}
