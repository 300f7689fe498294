use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use service_core::axum::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::services::ServiceError;

/// Outbound token delivery. The service only produces raw tokens and their
/// expiry; getting them to an inbox is this collaborator's problem.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_password_reset(
        &self,
        to_email: &str,
        reset_token: &str,
        base_url: &str,
    ) -> Result<(), ServiceError>;

    async fn send_client_access(
        &self,
        to_email: &str,
        project_id: Uuid,
        access_token: &str,
        base_url: &str,
    ) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &crate::config::SmtpConfig) -> Result<Self, ServiceError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.user.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
    ) -> Result<(), ServiceError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| {
                        ServiceError::Internal(anyhow::anyhow!(e))
                    })?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| {
                    ServiceError::Internal(anyhow::anyhow!(e))
                })?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(plain_body.to_string())
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?;

        // The sync SMTP transport must not block the async runtime
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e.to_string(), to = %to_email, "Failed to send email");
                Err(ServiceError::Email(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_password_reset(
        &self,
        to_email: &str,
        reset_token: &str,
        base_url: &str,
    ) -> Result<(), ServiceError> {
        let reset_link = format!(
            "{}/auth/password-reset/confirm?token={}",
            base_url, reset_token
        );

        let plain_body = format!(
            "Password Reset Request\n\n\
             We received a request to reset your password. Visit the following link to set a new password:\n\n\
             {}\n\n\
             This link will expire in 15 minutes. If you didn't request this, please ignore this email.",
            reset_link
        );

        self.send_email(to_email, "Reset Your Password", &plain_body)
            .await
    }

    async fn send_client_access(
        &self,
        to_email: &str,
        project_id: Uuid,
        access_token: &str,
        base_url: &str,
    ) -> Result<(), ServiceError> {
        let access_link = format!(
            "{}/client/access/redeem?project={}&token={}",
            base_url, project_id, access_token
        );

        let plain_body = format!(
            "You have been given access to a project.\n\n\
             Visit the following link to view it:\n\n\
             {}\n\n\
             This link will expire in 7 days.",
            access_link
        );

        self.send_email(to_email, "Project Access", &plain_body)
            .await
    }
}

/// Captured outbound message, for assertions in tests.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub token: String,
}

/// Mock provider that records what would have been sent.
#[derive(Default)]
pub struct MockEmailService {
    pub password_resets: std::sync::Mutex<Vec<SentEmail>>,
    pub client_access: std::sync::Mutex<Vec<SentEmail>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_password_reset(
        &self,
        to_email: &str,
        reset_token: &str,
        _base_url: &str,
    ) -> Result<(), ServiceError> {
        self.password_resets
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("mock mutex poisoned: {}", e)))?
            .push(SentEmail {
                to: to_email.to_string(),
                token: reset_token.to_string(),
            });
        Ok(())
    }

    async fn send_client_access(
        &self,
        to_email: &str,
        _project_id: Uuid,
        access_token: &str,
        _base_url: &str,
    ) -> Result<(), ServiceError> {
        self.client_access
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("mock mutex poisoned: {}", e)))?
            .push(SentEmail {
                to: to_email.to_string(),
                token: access_token.to_string(),
            });
        Ok(())
    }
}
