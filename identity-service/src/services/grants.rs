//! Client access grants.
//!
//! A grant binds a (client email, project) pair to a token with an expiry.
//! Granting upserts on the pair, so a client holds at most one live grant
//! per project; validity is only ever checked at use time.

use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::models::{AccessGrant, ClientAccess};
use crate::services::tokens::generate_token;
use crate::services::{IdentityStore, ServiceError};

#[derive(Clone)]
pub struct GrantService {
    store: Arc<dyn IdentityStore>,
}

impl GrantService {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    /// Issue (or refresh) a grant for the pair. Returns the grant with its
    /// raw token for out-of-band delivery.
    pub async fn grant(
        &self,
        client_email: &str,
        project_id: Uuid,
    ) -> Result<AccessGrant, ServiceError> {
        let grant = AccessGrant::new(
            client_email.to_lowercase(),
            project_id,
            generate_token(),
        );
        self.store.upsert_access_grant(&grant).await?;

        tracing::info!(project_id = %project_id, "Client access granted");

        Ok(grant)
    }

    /// Validate a presented grant token. Missing, expired and mismatched
    /// grants all fail the same way.
    pub async fn redeem(
        &self,
        client_email: &str,
        project_id: Uuid,
        token: &str,
    ) -> Result<ClientAccess, ServiceError> {
        let grant = self
            .store
            .find_access_grant(client_email, project_id)
            .await?
            .ok_or(ServiceError::InvalidOrExpiredToken)?;

        let token_matches: bool = grant.token.as_bytes().ct_eq(token.as_bytes()).into();
        if !grant.is_usable() || !token_matches {
            return Err(ServiceError::InvalidOrExpiredToken);
        }

        Ok(ClientAccess {
            project_id,
            email: grant.client_email,
        })
    }
}
