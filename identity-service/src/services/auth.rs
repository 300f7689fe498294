//! Identity resolution strategies.
//!
//! A closed set of named strategies behind one capability interface: each
//! resolves external credentials to a canonical identity or fails. There is
//! no registration step; the service owns both strategies and routes by
//! credential kind.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::Identity;
use crate::services::{IdentityStore, ServiceError};
use crate::utils::{hash_password, parse_display_name, verify_password, Password};

/// External credentials presented for one authentication attempt.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Local email + password login.
    Password { email: String, password: String },
    /// Claims from an OAuth provider callback.
    Provider {
        subject: String,
        email: Option<String>,
        display_name: Option<String>,
    },
}

#[async_trait]
pub trait Strategy: Send + Sync {
    async fn attempt(&self, credentials: &Credentials) -> Result<Identity, ServiceError>;
}

/// Local password strategy.
///
/// Both failure legs (unknown email, wrong password) return the same
/// `InvalidCredentials` and cost one argon2 verification - the unknown-email
/// leg verifies against a fixed dummy digest so response timing does not
/// separate the two.
pub struct PasswordStrategy {
    store: Arc<dyn IdentityStore>,
    dummy_hash: String,
}

impl PasswordStrategy {
    pub fn new(store: Arc<dyn IdentityStore>) -> Result<Self, ServiceError> {
        let dummy_hash = hash_password(&Password::new("equalize-timing".to_string()))
            .map_err(ServiceError::Internal)?
            .into_string();
        Ok(Self { store, dummy_hash })
    }
}

#[async_trait]
impl Strategy for PasswordStrategy {
    async fn attempt(&self, credentials: &Credentials) -> Result<Identity, ServiceError> {
        let (email, password) = match credentials {
            Credentials::Password { email, password } => (email.clone(), password.clone()),
            Credentials::Provider { .. } => return Err(ServiceError::InvalidCredentials),
        };

        let identity = self.store.find_identity_by_email(&email).await?;

        let stored_hash = match &identity {
            Some(identity) => identity
                .password_hash
                .clone()
                .unwrap_or_else(|| self.dummy_hash.clone()),
            None => self.dummy_hash.clone(),
        };

        let candidate = Password::new(password);
        let verified = tokio::task::spawn_blocking(move || {
            verify_password(&candidate, &stored_hash)
        })
        .await
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?;

        match identity {
            Some(identity) if verified && identity.password_hash.is_some() => Ok(identity),
            _ => Err(ServiceError::InvalidCredentials),
        }
    }
}

/// OAuth provider strategy.
///
/// Unifies on the provider subject id first, then on email (linking the
/// subject id to the existing account), and creates the identity otherwise.
/// Creation is a single insert, so an aborted flow leaves no partial state.
pub struct ProviderStrategy {
    store: Arc<dyn IdentityStore>,
}

impl ProviderStrategy {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Strategy for ProviderStrategy {
    async fn attempt(&self, credentials: &Credentials) -> Result<Identity, ServiceError> {
        let (subject, email, display_name) = match credentials {
            Credentials::Provider {
                subject,
                email,
                display_name,
            } => (subject, email, display_name),
            Credentials::Password { .. } => return Err(ServiceError::InvalidCredentials),
        };

        if let Some(identity) = self.store.find_identity_by_provider_id(subject).await? {
            return Ok(identity);
        }

        // No account may be created without a reachable email
        let email = email
            .as_deref()
            .ok_or(ServiceError::MissingRequiredClaim)?;

        if let Some(identity) = self.store.find_identity_by_email(email).await? {
            self.store
                .link_provider_id(identity.identity_id, subject)
                .await?;
            tracing::info!(identity_id = %identity.identity_id, "Linked provider subject to existing identity");
            return Ok(Identity {
                provider_id: Some(subject.clone()),
                ..identity
            });
        }

        let name = display_name
            .as_deref()
            .and_then(parse_display_name);
        let identity = Identity::from_provider(subject.clone(), email.to_string(), name);
        self.store.insert_identity(&identity).await?;

        tracing::info!(identity_id = %identity.identity_id, "Identity created from provider profile");

        Ok(identity)
    }
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn IdentityStore>,
    password_strategy: Arc<PasswordStrategy>,
    provider_strategy: Arc<ProviderStrategy>,
}

impl AuthService {
    pub fn new(store: Arc<dyn IdentityStore>) -> Result<Self, ServiceError> {
        let password_strategy = Arc::new(PasswordStrategy::new(store.clone())?);
        let provider_strategy = Arc::new(ProviderStrategy::new(store.clone()));
        Ok(Self {
            store,
            password_strategy,
            provider_strategy,
        })
    }

    /// Resolve credentials to an identity through the matching strategy.
    pub async fn attempt(&self, credentials: &Credentials) -> Result<Identity, ServiceError> {
        match credentials {
            Credentials::Password { .. } => self.password_strategy.attempt(credentials).await,
            Credentials::Provider { .. } => self.provider_strategy.attempt(credentials).await,
        }
    }

    /// Register a new identity with a local password path.
    pub async fn register(
        &self,
        email: String,
        password: String,
        display_name: String,
    ) -> Result<Identity, ServiceError> {
        if self
            .store
            .find_identity_by_email(&email)
            .await?
            .is_some()
        {
            return Err(ServiceError::EmailAlreadyRegistered);
        }

        let plaintext = Password::new(password);
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&plaintext))
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?
            .map_err(ServiceError::Internal)?;

        let name = parse_display_name(&display_name);
        let identity = Identity::with_password(email, password_hash.into_string(), name);
        self.store.insert_identity(&identity).await?;

        tracing::info!(identity_id = %identity.identity_id, "Identity registered");

        Ok(identity)
    }
}
