//! Opaque single-use token issuance and consumption.
//!
//! Raw tokens are 64 hex characters from 256 bits of OS randomness and are
//! never persisted; only their SHA-256 digest is stored and compared.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::ResetToken;
use crate::services::{IdentityStore, ServiceError, SessionStore};
use crate::utils::{hash_password, Password};

const TOKEN_BYTES: usize = 32;

/// Generate an opaque high-entropy token (64 hex characters).
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One-way transform of a raw token. Stable, fixed-length hex output.
pub fn digest(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}

/// A freshly issued reset token. The raw secret exists only here and in the
/// outbound delivery channel.
#[derive(Debug)]
pub struct IssuedToken {
    pub raw_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn IdentityStore>,
    sessions: Arc<dyn SessionStore>,
}

impl TokenService {
    pub fn new(store: Arc<dyn IdentityStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { store, sessions }
    }

    /// Issue a password-reset token for an identity, superseding any prior
    /// unconsumed token for the same identity.
    pub async fn issue_reset_token(
        &self,
        identity_id: Uuid,
    ) -> Result<IssuedToken, ServiceError> {
        let raw_token = generate_token();
        let token = ResetToken::new(identity_id, digest(&raw_token));
        let expires_at = token.expires_at;

        self.store.upsert_reset_token(&token).await?;

        tracing::info!(identity_id = %identity_id, "Reset token issued");

        Ok(IssuedToken {
            raw_token,
            expires_at,
        })
    }

    /// Consume a reset token and set the identity's new password.
    ///
    /// The conditional write in the store claims the token; of two concurrent
    /// callers exactly one proceeds, the other sees the same
    /// `InvalidOrExpiredToken` a wrong or stale token produces.
    pub async fn consume_reset_token(
        &self,
        raw_token: &str,
        new_password: &str,
    ) -> Result<Uuid, ServiceError> {
        let identity_id = self
            .store
            .consume_reset_token(&digest(raw_token))
            .await?
            .ok_or(ServiceError::InvalidOrExpiredToken)?;

        let password = Password::new(new_password.to_string());
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?
            .map_err(ServiceError::Internal)?;

        self.store
            .update_password_hash(identity_id, password_hash.as_str())
            .await?;

        // A credential change ends every live session for the account
        self.sessions.destroy_all_for_identity(identity_id).await?;

        tracing::info!(identity_id = %identity_id, "Password reset completed");

        Ok(identity_id)
    }
}
