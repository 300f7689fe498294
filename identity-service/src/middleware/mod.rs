pub mod auth;

pub use auth::{
    require_auth_middleware, session_cookie, session_middleware, CurrentIdentity,
    MaybeClientAccess, SessionId,
};
