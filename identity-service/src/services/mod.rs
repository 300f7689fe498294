//! Services layer.
//!
//! Business logic for identity resolution, sessions, tokens, client access
//! grants, and billing webhook handling.

pub mod auth;
mod database;
mod email;
pub mod error;
mod grants;
pub mod session;
mod store;
pub mod tokens;
pub mod webhook;

pub use auth::{AuthService, Credentials, PasswordStrategy, ProviderStrategy, Strategy};
pub use database::Database;
pub use email::{EmailProvider, EmailService, MockEmailService, SentEmail};
pub use error::ServiceError;
pub use grants::GrantService;
pub use session::{
    deserialize_identity, serialize_identity, MemorySessionStore, RedisSessionStore, SessionStore,
};
pub use store::{IdentityStore, MemoryStore};
pub use tokens::{IssuedToken, TokenService};
pub use webhook::{BillingEvent, WebhookService};
