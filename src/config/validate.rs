//! Config validation logic.
//! Checks settings that cannot be expressed in the XML schema.

use tracing::debug;

use super::types::Config;
use crate::errors::{DirTreeError, Result};

impl Config {
    /// Reject settings no command could run with.
    pub fn validate(&self) -> Result<()> {
        if self.retry_attempts == 0 {
            return Err(DirTreeError::Configuration(
                "retry_attempts must be at least 1".into(),
            ));
        }
        if let Some(log) = &self.log_file {
            if log.as_os_str().is_empty() {
                return Err(DirTreeError::Configuration(
                    "log_file must not be empty".into(),
                ));
            }
            if log.is_dir() {
                return Err(DirTreeError::Configuration(format!(
                    "log_file '{}' is a directory",
                    log.display()
                )));
            }
        }
        debug!(
            retry_attempts = self.retry_attempts,
            retry_delay_ms = self.retry_delay_ms,
            log_file = %self
                .log_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<none>".into()),
            "config validated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn zero_attempts_rejected() {
        let cfg = Config {
            retry_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(DirTreeError::Configuration(_))));
    }

    #[test]
    fn log_file_directory_rejected() {
        let td = tempfile::tempdir().unwrap();
        let cfg = Config {
            log_file: Some(td.path().to_path_buf()),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(DirTreeError::Configuration(_))));

        let cfg = Config {
            log_file: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
