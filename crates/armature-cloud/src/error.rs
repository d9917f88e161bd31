//! Cloud provider error types

use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error(
        "Resource already exists: {0}\n\
        It needs to be imported into state before it can be managed"
    )]
    ResourceAlreadyExists(String),

    #[error("Invalid resource ID: {0}")]
    InvalidResourceId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Long-running operation failed: {0}")]
    OperationFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Resource provider registration failed: {0}")]
    ProviderRegistration(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether the remote object does not exist.
    ///
    /// Read paths treat this as "gone from state" and delete paths as
    /// "already deleted"; everything else is a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::ResourceNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        assert!(CloudError::ResourceNotFound("vnet".into()).is_not_found());
        assert!(
            !CloudError::ApiError {
                status: 500,
                message: "boom".into()
            }
            .is_not_found()
        );
        assert!(!CloudError::Timeout("update".into()).is_not_found());
    }

    #[test]
    fn test_api_error_display() {
        let err = CloudError::ApiError {
            status: 409,
            message: "AnotherOperationInProgress".into(),
        };
        assert_eq!(
            err.to_string(),
            "API error (HTTP 409): AnotherOperationInProgress"
        );
    }
}
