//! Session resolution and authentication gates.
//!
//! `session_middleware` runs on every request: it resolves the session
//! cookie to server-side state, re-checks that the referenced identity still
//! exists, and attaches the result to request extensions. A session whose
//! identity has been deleted is destroyed on the spot and the request
//! proceeds unauthenticated. Store failures also leave the request
//! unauthenticated - the gate fails closed.
//!
//! `require_auth_middleware` is the second, composable gate for route groups
//! that demand an authenticated identity.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service_core::error::AppError;

use crate::{
    config::{Environment, IdentityConfig},
    models::{ClientAccess, Identity, SESSION_COOKIE},
    services::deserialize_identity,
    AppState,
};

/// Authenticated identity resolved from the session, re-read from the record
/// store this request.
#[derive(Clone)]
pub struct CurrentIdentity(pub Identity);

/// Opaque id of the live session attached to this request.
#[derive(Clone)]
pub struct SessionId(pub String);

pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let session_id = match jar.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return next.run(req).await,
    };

    let record = match state.sessions.get(&session_id).await {
        Ok(Some(record)) => record,
        Ok(None) => return next.run(req).await,
        Err(e) => {
            // Fail closed: an unreachable session store means no session
            tracing::error!(error = %e, "Session lookup failed; treating request as unauthenticated");
            return next.run(req).await;
        }
    };

    let identity = match record.identity_id {
        Some(identity_id) => match deserialize_identity(state.store.as_ref(), &record).await {
            Ok(Some(identity)) => Some(identity),
            Ok(None) => {
                // The account was deleted while the session was live; the
                // session dies with it.
                tracing::info!(identity_id = %identity_id, "Session references a deleted identity; destroying it");
                if let Err(e) = state.sessions.destroy(&session_id).await {
                    tracing::error!(error = %e, "Failed to destroy stale session");
                }
                return next.run(req).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Identity lookup failed; treating request as unauthenticated");
                return next.run(req).await;
            }
        },
        None => None,
    };

    req.extensions_mut().insert(SessionId(session_id));
    if let Some(identity) = identity {
        req.extensions_mut().insert(CurrentIdentity(identity));
    }
    if let Some(access) = record.client_access {
        req.extensions_mut().insert(access);
    }

    next.run(req).await
}

/// Reject requests that did not resolve to an authenticated identity.
pub async fn require_auth_middleware(req: Request, next: Next) -> Result<Response, AppError> {
    if req.extensions().get::<CurrentIdentity>().is_none() {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "authentication required"
        )));
    }
    Ok(next.run(req).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("authentication required")))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionId>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("authentication required")))
    }
}

/// Client-access context, when the session carries one. Never rejects.
pub struct MaybeClientAccess(pub Option<ClientAccess>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeClientAccess
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeClientAccess(
            parts.extensions.get::<ClientAccess>().cloned(),
        ))
    }
}

/// Build the session cookie: script-inaccessible, encrypted transport in
/// production, absolute lifetime from config.
pub fn session_cookie(session_id: String, config: &IdentityConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .secure(config.environment == Environment::Prod)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(config.session.ttl_days))
        .build()
}
