/// Error types for social-service
use doc_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("No signed-in user")]
    Unauthenticated,

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Some fan-out writes landed and some did not; nothing was rolled back.
    #[error("Fan-out of post {post_id} incomplete ({delivered} delivered, {failed} failed): {source}")]
    PartialFanOut {
        post_id: Uuid,
        delivered: usize,
        failed: usize,
        #[source]
        source: Box<ServiceError>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// True for failures that originated in the store transport
    pub fn is_store_failure(&self) -> bool {
        match self {
            ServiceError::Store(_) => true,
            ServiceError::PartialFanOut { source, .. } => source.is_store_failure(),
            _ => false,
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_fan_out_display_names_post() {
        let post_id = Uuid::nil();
        let err = ServiceError::PartialFanOut {
            post_id,
            delivered: 3,
            failed: 1,
            source: Box::new(ServiceError::Store(StoreError::Unavailable("down".into()))),
        };
        let message = err.to_string();
        assert!(message.contains(&post_id.to_string()));
        assert!(message.contains("3 delivered, 1 failed"));
        assert!(err.is_store_failure());
    }

    #[test]
    fn test_store_error_converts() {
        let err: ServiceError = StoreError::InvalidPath("x".into()).into();
        assert!(matches!(err, ServiceError::Store(_)));
        assert!(!ServiceError::Unauthenticated.is_store_failure());
    }
}
