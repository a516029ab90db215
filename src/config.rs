//! Sync configuration with sensible defaults for the tunables.
//!
//! [`SyncConfig`] carries everything a run needs from the outside world:
//! the service base URL, the project reference, the opaque credential,
//! the manager identity for planned-effort attribution, and the batching,
//! concurrency and rate-limit tunables. The defaults match the service's
//! published limits.

use crate::error::SyncError;

/// Configuration for one sync run.
///
/// Construct with [`SyncConfig::new`] for the three mandatory fields and
/// override tunables with struct-update syntax.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the remote project-management service, no trailing slash.
    pub base_url: String,
    /// Project reference: a bare project id or a full project URL (the
    /// last path segment is taken as the id).
    pub project: String,
    /// Opaque credential string attached verbatim to every request.
    pub credential: String,
    /// Member id used as the submitter of planned-effort entries. Planned
    /// effort cannot be written without it.
    pub manager_id: Option<String>,
    /// Number of source tasks per sequential batch.
    pub batch_size: usize,
    /// Upper bound on concurrently in-flight tasks within a batch.
    pub max_concurrent: usize,
    /// Maximum requests allowed within one rate-limit window.
    pub rate_limit_max: usize,
    /// Width of the sliding rate-limit window in milliseconds.
    pub rate_limit_window_ms: u64,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Page size used when fetching the remote task index.
    pub page_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            project: String::new(),
            credential: String::new(),
            manager_id: None,
            batch_size: 20,
            max_concurrent: 5,
            rate_limit_max: 5,
            rate_limit_window_ms: 1000,
            timeout_seconds: 15,
            page_size: 300,
        }
    }
}

impl SyncConfig {
    /// Build a configuration with the mandatory fields set and every
    /// tunable at its default.
    pub fn new(
        base_url: impl Into<String>,
        project: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            project: project.into(),
            credential: credential.into(),
            ..Default::default()
        }
    }

    /// Validates this configuration, returning an error if any field is
    /// unusable.
    ///
    /// Checks:
    /// - `base_url`, `project` and `credential` must be non-empty
    /// - `batch_size`, `max_concurrent`, `rate_limit_max` and `page_size`
    ///   must be greater than 0
    /// - `rate_limit_window_ms` and `timeout_seconds` must be greater than 0
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.base_url.trim().is_empty() {
            return Err(SyncError::Config("base_url must not be empty".into()));
        }
        if self.project.trim().is_empty() {
            return Err(SyncError::Config("project reference must not be empty".into()));
        }
        if self.credential.trim().is_empty() {
            return Err(SyncError::Config("credential must not be empty".into()));
        }
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch_size must be greater than 0".into()));
        }
        if self.max_concurrent == 0 {
            return Err(SyncError::Config(
                "max_concurrent must be greater than 0".into(),
            ));
        }
        if self.rate_limit_max == 0 {
            return Err(SyncError::Config(
                "rate_limit_max must be greater than 0".into(),
            ));
        }
        if self.rate_limit_window_ms == 0 {
            return Err(SyncError::Config(
                "rate_limit_window_ms must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SyncError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.page_size == 0 {
            return Err(SyncError::Config("page_size must be greater than 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SyncConfig {
        SyncConfig::new("https://pm.example.com", "proj-1", "SESSION=abc")
    }

    #[test]
    fn default_tunables() {
        let config = SyncConfig::default();
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.max_concurrent, 5);
        assert_eq!(config.rate_limit_max, 5);
        assert_eq!(config.rate_limit_window_ms, 1000);
        assert_eq!(config.timeout_seconds, 15);
        assert_eq!(config.page_size, 300);
        assert!(config.manager_id.is_none());
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn empty_base_url_rejected() {
        let config = SyncConfig::new("", "proj-1", "SESSION=abc");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn empty_project_rejected() {
        let config = SyncConfig::new("https://pm.example.com", "  ", "SESSION=abc");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("project"));
    }

    #[test]
    fn empty_credential_rejected() {
        let config = SyncConfig::new("https://pm.example.com", "proj-1", "");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("credential"));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let config = SyncConfig {
            batch_size: 0,
            ..valid_config()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn zero_max_concurrent_rejected() {
        let config = SyncConfig {
            max_concurrent: 0,
            ..valid_config()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrent"));
    }

    #[test]
    fn zero_rate_limit_window_rejected() {
        let config = SyncConfig {
            rate_limit_window_ms: 0,
            ..valid_config()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rate_limit_window_ms"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = SyncConfig {
            timeout_seconds: 0,
            ..valid_config()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn manager_id_optional_for_validation() {
        let config = SyncConfig {
            manager_id: Some("member-9".into()),
            ..valid_config()
        };
        assert!(config.validate().is_ok());
    }
}
