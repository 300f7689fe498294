//! Test helpers for identity-service integration tests.
//!
//! Tests run against the real router with in-memory collaborators; no
//! external services are required.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::util::ServiceExt;

use identity_service::{
    build_router,
    config::{
        BillingConfig, DatabaseConfig, Environment, GoogleOAuthConfig, IdentityConfig,
        RedisConfig, SecurityConfig, SessionConfig, SmtpConfig, SwaggerConfig, SwaggerMode,
    },
    services::{
        AuthService, EmailProvider, GrantService, IdentityStore, MemorySessionStore, MemoryStore,
        MockEmailService, SessionStore, TokenService, WebhookService,
    },
    AppState,
};

pub const WEBHOOK_SECRET: &str = "whsec_test";

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub sessions: Arc<MemorySessionStore>,
    pub email: Arc<MockEmailService>,
    pub router: axum::Router,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let config = create_test_config();

        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(MemorySessionStore::new());
        let email = Arc::new(MockEmailService::new());

        let store_dyn: Arc<dyn IdentityStore> = store.clone();
        let sessions_dyn: Arc<dyn SessionStore> = sessions.clone();
        let email_dyn: Arc<dyn EmailProvider> = email.clone();

        let auth = AuthService::new(store_dyn.clone()).expect("Failed to create auth service");
        let tokens = TokenService::new(store_dyn.clone(), sessions_dyn.clone());
        let grants = GrantService::new(store_dyn.clone());
        let webhooks = WebhookService::new(store_dyn.clone(), WEBHOOK_SECRET.to_string());

        let state = AppState {
            config,
            store: store_dyn,
            sessions: sessions_dyn,
            email: email_dyn,
            auth,
            tokens,
            grants,
            webhooks,
        };

        let router = build_router(state.clone())
            .await
            .expect("Failed to build router");

        TestApp {
            state,
            store,
            sessions,
            email,
            router,
        }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(session_id) = cookie {
            builder = builder.header(header::COOKIE, format!("sid={}", session_id));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Register an identity and return its session id.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> String {
        let response = self
            .request(
                "POST",
                "/auth/register",
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": password,
                    "name": name,
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        session_cookie_value(&response).expect("registration should start a session")
    }

    /// Login and return the session id.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                "POST",
                "/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie_value(&response).expect("login should start a session")
    }

    /// Post a raw webhook body with an optional signature header.
    pub async fn send_webhook(&self, body: &str, signature: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/webhooks/billing")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header("billing-signature", signature);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Create a project for the session and return its id.
    pub async fn create_project(&self, session_id: &str, name: &str) -> uuid::Uuid {
        let response = self
            .request(
                "POST",
                "/projects",
                Some(session_id),
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        body["project_id"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("project id in response")
    }
}

fn create_test_config() -> IdentityConfig {
    IdentityConfig {
        common: service_core::config::Config { port: 8080 },
        environment: Environment::Dev,
        service_name: "identity-service-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "debug".to_string(),
        base_url: "http://localhost:8080".to_string(),
        database: DatabaseConfig {
            url: "postgres://localhost/identity_test".to_string(),
            max_connections: 5,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://localhost:6379".to_string(),
        },
        session: SessionConfig { ttl_days: 15 },
        google: GoogleOAuthConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            redirect_uri: "http://localhost:8080/auth/google/callback".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        },
        smtp: SmtpConfig {
            host: "smtp.example.com".to_string(),
            user: "test@example.com".to_string(),
            password: "test-password".to_string(),
        },
        billing: BillingConfig {
            webhook_secret: WEBHOOK_SECRET.to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
    }
}

/// Extract the `sid` cookie value from a response, if one was set.
pub fn session_cookie_value(response: &Response) -> Option<String> {
    for value in response.headers().get_all(header::SET_COOKIE) {
        let raw = value.to_str().ok()?;
        if let Some(rest) = raw.strip_prefix("sid=") {
            let value = rest.split(';').next().unwrap_or("").to_string();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}
