use portal_core::error::AppError;
use thiserror::Error;

/// Failures talking to the identity provider.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The provider understood the request and refused it. `message` is the
    /// provider's own wording and is shown to the user unchanged.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Identity provider timed out")]
    Timeout,

    #[error("Unexpected identity provider response: {0}")]
    InvalidResponse(String),
}

impl IdentityError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        IdentityError::Rejected {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IdentityError::Timeout
        } else if err.is_decode() {
            IdentityError::InvalidResponse(err.to_string())
        } else {
            IdentityError::Unavailable(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected { message, .. } => AppError::BadRequest(anyhow::anyhow!(message)),
            IdentityError::Unavailable(e) => AppError::BadGateway(e),
            IdentityError::Timeout => AppError::GatewayTimeout("identity provider".to_string()),
            IdentityError::InvalidResponse(e) => AppError::BadGateway(e),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
        }
    }
}
