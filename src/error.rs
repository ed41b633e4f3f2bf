// SPDX-License-Identifier: MIT

//! Error taxonomy for the session core.
//!
//! Remote failures split into a soft class (quota-exhausted, permission
//! denied) that callers swallow with a warning and proceed on empty or stale
//! data, and a hard class that propagates. Local optimistic state is never
//! rolled back on a persistence failure.

/// Error type shared by the document store, sync adapter, and stores.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The document does not exist yet. Treated as "no data", not a failure.
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Backend quota hit. A soft warning, never a user-visible failure.
    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Document store error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SyncError {
    /// True for failure classes callers degrade gracefully on.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            SyncError::PermissionDenied(_) | SyncError::QuotaExhausted(_)
        )
    }

    /// Classify a backend error message into the taxonomy.
    ///
    /// The backing SDK reports gRPC status by name inside the message, so
    /// this matches on substrings. Inherited contract; the category set is
    /// what matters.
    pub fn classify_backend(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("not found") || lower.contains("notfound") {
            SyncError::NotFound(message)
        } else if lower.contains("permission") || lower.contains("unauthenticated") {
            SyncError::PermissionDenied(message)
        } else if lower.contains("resource exhausted")
            || lower.contains("resourceexhausted")
            || lower.contains("quota")
        {
            SyncError::QuotaExhausted(message)
        } else {
            SyncError::Backend(message)
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_by_status_name() {
        assert!(matches!(
            SyncError::classify_backend("status: NotFound, message: ..."),
            SyncError::NotFound(_)
        ));
        assert!(matches!(
            SyncError::classify_backend("PERMISSION_DENIED: missing rules"),
            SyncError::PermissionDenied(_)
        ));
        assert!(matches!(
            SyncError::classify_backend("ResourceExhausted: quota exceeded"),
            SyncError::QuotaExhausted(_)
        ));
        assert!(matches!(
            SyncError::classify_backend("connection reset"),
            SyncError::Backend(_)
        ));
    }

    #[test]
    fn test_soft_classes() {
        assert!(SyncError::QuotaExhausted("q".into()).is_soft());
        assert!(SyncError::PermissionDenied("p".into()).is_soft());
        assert!(!SyncError::NotFound("n".into()).is_soft());
        assert!(!SyncError::Backend("b".into()).is_soft());
    }
}
