//! HTTP handlers.

pub mod auth;
pub mod grants;
pub mod projects;
pub mod user;
pub mod webhooks;
