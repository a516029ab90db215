//! Error types for the tasksync crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. The opaque credential never appears in
//! error messages.

/// Errors that can occur while reconciling source tasks against the
/// remote service.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Invalid sync configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A sync run is already in progress; concurrent runs are rejected,
    /// not queued.
    #[error("a sync run is already in progress")]
    AlreadyRunning,

    /// A bootstrap call (project, organization, tasklist, member or task
    /// index lookup) failed. Aborts the whole run.
    #[error("bootstrap failed: {0}")]
    Bootstrap(String),

    /// A transport-level HTTP failure that survived all retries.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The remote service answered with a non-2xx status, or a 2xx body
    /// that was not the JSON the caller expects. Never retried at the
    /// transport layer.
    #[error("remote API error (status {status}): {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Error payload (truncated) returned by the service.
        message: String,
    },

    /// A per-field update could not be attempted or completed. Recorded
    /// against the owning task; never aborts the run.
    #[error("field update failed: {0}")]
    Field(String),
}

/// Convenience type alias for tasksync results.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_config() {
        let err = SyncError::Config("batch_size must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "config error: batch_size must be greater than 0"
        );
    }

    #[test]
    fn display_already_running() {
        let err = SyncError::AlreadyRunning;
        assert_eq!(err.to_string(), "a sync run is already in progress");
    }

    #[test]
    fn display_bootstrap() {
        let err = SyncError::Bootstrap("organization lookup failed".into());
        assert_eq!(err.to_string(), "bootstrap failed: organization lookup failed");
    }

    #[test]
    fn display_http() {
        let err = SyncError::Http("connection refused".into());
        assert_eq!(err.to_string(), "HTTP error: connection refused");
    }

    #[test]
    fn display_api_carries_status() {
        let err = SyncError::Api {
            status: 403,
            message: "forbidden".into(),
        };
        assert_eq!(err.to_string(), "remote API error (status 403): forbidden");
    }

    #[test]
    fn display_field() {
        let err = SyncError::Field("manager identity not configured".into());
        assert_eq!(
            err.to_string(),
            "field update failed: manager identity not configured"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}
