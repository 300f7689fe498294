use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    // Generic on purpose: the response must not reveal which leg failed.
    #[error("incorrect email or password")]
    InvalidCredentials,

    #[error("provider profile is missing a required claim")]
    MissingRequiredClaim,

    // Covers wrong, expired and already-consumed tokens alike.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("authentication required")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("email already registered")]
    EmailAlreadyRegistered,

    #[error("invalid webhook signature")]
    SignatureRejected,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("email error: {0}")]
    Email(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::anyhow!(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("incorrect email or password"))
            }
            ServiceError::MissingRequiredClaim => AppError::BadRequest(anyhow::anyhow!(
                "provider profile is missing a required claim"
            )),
            ServiceError::InvalidOrExpiredToken => {
                AppError::BadRequest(anyhow::anyhow!("invalid or expired token"))
            }
            ServiceError::Unauthorized => {
                AppError::Unauthorized(anyhow::anyhow!("authentication required"))
            }
            ServiceError::Forbidden => AppError::Forbidden(anyhow::anyhow!("forbidden")),
            ServiceError::NotFound => AppError::NotFound(anyhow::anyhow!("not found")),
            ServiceError::EmailAlreadyRegistered => {
                AppError::Conflict(anyhow::anyhow!("email already registered"))
            }
            ServiceError::SignatureRejected => {
                AppError::BadRequest(anyhow::anyhow!("invalid webhook signature"))
            }
            ServiceError::Validation(e) => AppError::BadRequest(anyhow::anyhow!(e)),
            ServiceError::Email(e) => AppError::EmailError(e),
        }
    }
}
