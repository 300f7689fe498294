use identity_service::{
    build_router,
    config::IdentityConfig,
    db,
    services::{
        AuthService, Database, EmailService, GrantService, RedisSessionStore, TokenService,
        WebhookService,
    },
    AppState,
};
use service_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = IdentityConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting identity service"
    );

    // Record store
    let pool = db::create_pool(&config.database)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| service_core::error::AppError::DatabaseError(anyhow::anyhow!(e)))?;
    let store = Arc::new(Database::new(pool));
    tracing::info!("Record store initialized");

    // Session store
    let sessions = Arc::new(RedisSessionStore::new(&config.redis).await?);
    tracing::info!("Session store initialized");

    // Outbound email
    let email = Arc::new(EmailService::new(&config.smtp)?);
    tracing::info!("Email service initialized");

    // Domain services
    let store = store as Arc<dyn identity_service::services::IdentityStore>;
    let sessions = sessions as Arc<dyn identity_service::services::SessionStore>;
    let auth = AuthService::new(store.clone())?;
    let tokens = TokenService::new(store.clone(), sessions.clone());
    let grants = GrantService::new(store.clone());
    let webhooks = WebhookService::new(store.clone(), config.billing.webhook_secret.clone());

    let state = AppState {
        config: config.clone(),
        store,
        sessions,
        email,
        auth,
        tokens,
        grants,
        webhooks,
    };

    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
