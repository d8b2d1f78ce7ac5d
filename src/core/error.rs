use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Authentication required: {0}")]
    Authentication(String),

    #[error("Entitlement denied: {0}")]
    Entitlement(String),

    #[error("Package not ready: {0}")]
    PackageNotReady(String),

    #[error("Invalid session state: {0}")]
    SessionState(String),

    #[error("Validation failed for '{element}': {reason}")]
    Validation { element: String, reason: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

impl RuntimeError {
    pub fn validation(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for the structured error body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication_required",
            Self::Entitlement(_) => "entitlement_denied",
            Self::PackageNotReady(_) => "package_not_ready",
            Self::SessionState(_) => "invalid_session_state",
            Self::Validation { .. } => "validation_failed",
            Self::RateLimit(_) => "rate_limited",
            Self::Persistence(_) => "persistence_failed",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for RuntimeError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Internal(err.to_string())
    }
}
