//! Identity model - the canonical account record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::utils::FullName;

/// Canonical account record. Holds a password hash, an external provider
/// subject id, or both - never neither.
#[derive(Debug, Clone, FromRow)]
pub struct Identity {
    pub identity_id: Uuid,
    pub email: String,
    pub provider_id: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub billing_customer_id: Option<String>,
    pub plan: String,
    pub created_utc: DateTime<Utc>,
}

impl Identity {
    /// Create an identity with a local password path.
    pub fn with_password(email: String, password_hash: String, name: Option<FullName>) -> Self {
        let (first_name, last_name) = split_name(name);
        Self {
            identity_id: Uuid::new_v4(),
            email,
            provider_id: None,
            password_hash: Some(password_hash),
            first_name,
            last_name,
            billing_customer_id: None,
            plan: "free".to_string(),
            created_utc: Utc::now(),
        }
    }

    /// Create an identity from an OAuth provider profile. No password path.
    pub fn from_provider(provider_id: String, email: String, name: Option<FullName>) -> Self {
        let (first_name, last_name) = split_name(name);
        Self {
            identity_id: Uuid::new_v4(),
            email,
            provider_id: Some(provider_id),
            password_hash: None,
            first_name,
            last_name,
            billing_customer_id: None,
            plan: "free".to_string(),
            created_utc: Utc::now(),
        }
    }

    /// Convert to sanitized response. The password hash never leaves this
    /// boundary.
    pub fn sanitized(&self) -> IdentityResponse {
        IdentityResponse {
            identity_id: self.identity_id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            plan: self.plan.clone(),
            created_utc: self.created_utc,
        }
    }
}

fn split_name(name: Option<FullName>) -> (Option<String>, Option<String>) {
    match name {
        Some(n) => (Some(n.first_name), Some(n.last_name)),
        None => (None, None),
    }
}

/// Identity response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IdentityResponse {
    pub identity_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub plan: String,
    pub created_utc: DateTime<Utc>,
}
