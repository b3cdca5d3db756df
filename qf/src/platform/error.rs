//! Platform error taxonomy

use thiserror::Error;

/// Errors surfaced by the platform client
///
/// `NotFound` and `Forbidden` on a tracked message are treated as
/// authoritative absence: the entry is pruned and never retried. The
/// platform's consistency model makes retrying pointless.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("message not found")]
    NotFound,

    #[error("access forbidden")]
    Forbidden,

    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl PlatformError {
    /// True when the error means the message is gone for good
    pub fn is_gone(&self) -> bool {
        matches!(self, PlatformError::NotFound | PlatformError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_gone() {
        assert!(PlatformError::NotFound.is_gone());
        assert!(PlatformError::Forbidden.is_gone());
        assert!(!PlatformError::Unavailable("timeout".to_string()).is_gone());
    }
}
