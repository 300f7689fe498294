pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{request_id_middleware, security_headers_middleware};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::IdentityConfig;
use crate::services::{
    AuthService, EmailProvider, GrantService, IdentityStore, SessionStore, TokenService,
    WebhookService,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::registration::register,
        handlers::auth::session::login,
        handlers::auth::session::logout,
        handlers::auth::password::request_password_reset,
        handlers::auth::password::confirm_password_reset,
        handlers::user::get_me,
        handlers::user::update_me,
        handlers::user::delete_me,
        handlers::projects::create_project,
        handlers::projects::list_projects,
        handlers::projects::get_project,
        handlers::projects::update_project,
        handlers::projects::delete_project,
        handlers::grants::grant_access,
        handlers::grants::redeem_access,
        handlers::grants::get_client_project,
        handlers::webhooks::billing_webhook,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::LoginRequest,
            dtos::auth::PasswordResetRequest,
            dtos::auth::PasswordResetResponse,
            dtos::auth::PasswordResetConfirm,
            dtos::auth::UpdateProfileRequest,
            dtos::projects::CreateProjectRequest,
            dtos::projects::UpdateProjectRequest,
            dtos::projects::GrantAccessRequest,
            dtos::projects::GrantAccessResponse,
            dtos::projects::RedeemAccessRequest,
            models::IdentityResponse,
            models::ProjectResponse,
        )
    ),
    tags(
        (name = "Authentication", description = "Registration, login, and password reset"),
        (name = "User", description = "Profile management"),
        (name = "Projects", description = "Project ownership"),
        (name = "Client Access", description = "Project-scoped access for non-account clients"),
        (name = "Webhooks", description = "Signed billing events"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: IdentityConfig,
    pub store: Arc<dyn IdentityStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub email: Arc<dyn EmailProvider>,
    pub auth: AuthService,
    pub tokens: TokenService,
    pub grants: GrantService,
    pub webhooks: WebhookService,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Routes behind the authenticated-identity gate
    let protected = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/users/me",
            get(handlers::user::get_me)
                .patch(handlers::user::update_me)
                .delete(handlers::user::delete_me),
        )
        .route(
            "/projects",
            post(handlers::projects::create_project).get(handlers::projects::list_projects),
        )
        .route(
            "/projects/:project_id",
            get(handlers::projects::get_project)
                .patch(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        .route(
            "/projects/:project_id/access",
            post(handlers::grants::grant_access),
        )
        .layer(from_fn(middleware::require_auth_middleware));

    let mut app = Router::new().route("/health", get(health_check));

    let swagger_enabled = match state.config.swagger.enabled {
        crate::config::SwaggerMode::Public => true,
        crate::config::SwaggerMode::Disabled => false,
    };

    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        // Keep the OpenAPI JSON available for programmatic access
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        );
    }

    let app = app
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/google", get(handlers::auth::google_login))
        .route(
            "/auth/google/callback",
            get(handlers::auth::google_callback),
        )
        .route(
            "/auth/password-reset/request",
            post(handlers::auth::request_password_reset),
        )
        .route(
            "/auth/password-reset/confirm",
            post(handlers::auth::confirm_password_reset),
        )
        .route(
            "/client/access/redeem",
            post(handlers::grants::redeem_access),
        )
        .route(
            "/client/projects/:project_id",
            get(handlers::grants::get_client_project),
        )
        .route("/webhooks/billing", post(handlers::webhooks::billing_webhook))
        .merge(protected)
        .with_state(state.clone())
        // Session resolution runs on every request, before any handler
        .layer(from_fn_with_state(state.clone(), middleware::session_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<axum::http::HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                axum::http::HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_credentials(true)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::COOKIE,
                ]),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Record store health check failed");
        AppError::from(e)
    })?;

    state.sessions.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Session store health check failed");
        AppError::from(e)
    })?;

    Ok(axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up",
            "sessions": "up"
        }
    })))
}
