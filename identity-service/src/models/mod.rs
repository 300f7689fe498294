pub mod access_grant;
pub mod identity;
pub mod project;
pub mod reset_token;
pub mod session;

pub use access_grant::{AccessGrant, GRANT_TTL_DAYS};
pub use identity::{Identity, IdentityResponse};
pub use project::{Project, ProjectResponse};
pub use reset_token::{ResetToken, RESET_TOKEN_TTL_MINUTES};
pub use session::{ClientAccess, SessionRecord, SESSION_COOKIE};
