use thiserror::Error;

/// Result type for resilience operations
pub type Result<T> = std::result::Result<T, ResilienceError>;

/// Resilience layer error types
#[derive(Error, Debug)]
pub enum ResilienceError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Retries, supplied fallbacks and static fallback data all failed
    #[error("All fallback options exhausted for dependency: {0}")]
    Exhausted(String),

    /// Primary failure passed through unchanged (no policy configured)
    #[error(transparent)]
    Operation(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResilienceError {
    /// Whether this error means every degraded option was tried
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ResilienceError::Exhausted(_))
    }

    /// Name of the dependency that was exhausted, if any
    pub fn exhausted_dependency(&self) -> Option<&str> {
        match self {
            ResilienceError::Exhausted(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResilienceError::Exhausted("qloo".to_string());
        assert_eq!(
            err.to_string(),
            "All fallback options exhausted for dependency: qloo"
        );
        assert!(err.is_exhausted());
        assert_eq!(err.exhausted_dependency(), Some("qloo"));
    }

    #[test]
    fn test_operation_error_is_transparent() {
        let err = ResilienceError::Operation(anyhow::anyhow!("connection reset"));
        assert_eq!(err.to_string(), "connection reset");
        assert!(!err.is_exhausted());
        assert_eq!(err.exhausted_dependency(), None);
    }
}
