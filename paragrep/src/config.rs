use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::errors::{ScanError, ScanResult};

/// Hard ceiling on the worker pool size.
pub const MAX_WORKERS: usize = 32;

/// Configuration for a scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// POSIX extended regular expression to match paragraphs against.
    pub pattern: String,

    /// The input file to scan.
    pub file: PathBuf,

    /// Number of worker processes, between 1 and [`MAX_WORKERS`].
    pub workers: NonZeroUsize,

    /// Path of the per-chunk CSV log, overwritten at startup.
    pub log_path: PathBuf,

    /// Executable spawned for worker processes. `None` means the current
    /// executable re-invoked with its hidden worker subcommand.
    pub worker_exe: Option<PathBuf>,
}

impl ScanConfig {
    /// Creates a configuration, validating the worker count range.
    pub fn new(
        pattern: String,
        file: PathBuf,
        workers: usize,
        log_path: PathBuf,
    ) -> ScanResult<Self> {
        let workers = NonZeroUsize::new(workers)
            .filter(|w| w.get() <= MAX_WORKERS)
            .ok_or_else(|| {
                ScanError::config_error(format!(
                    "worker count must be between 1 and {MAX_WORKERS}"
                ))
            })?;

        Ok(ScanConfig {
            pattern,
            file,
            workers,
            log_path,
            worker_exe: None,
        })
    }

    /// Builder method to override the worker executable.
    pub fn with_worker_exe(mut self, exe: PathBuf) -> Self {
        self.worker_exe = Some(exe);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(workers: usize) -> ScanResult<ScanConfig> {
        ScanConfig::new(
            "needle".to_string(),
            PathBuf::from("input.txt"),
            workers,
            PathBuf::from("scan.csv"),
        )
    }

    #[test]
    fn test_accepts_full_worker_range() {
        assert!(make(1).is_ok());
        assert!(make(MAX_WORKERS).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_workers() {
        assert!(make(0).is_err());
        assert!(make(MAX_WORKERS + 1).is_err());
    }

    #[test]
    fn test_worker_exe_defaults_to_current_executable() {
        let config = make(4).unwrap();
        assert_eq!(config.worker_exe, None);

        let config = config.with_worker_exe(PathBuf::from("/opt/paragrep"));
        assert_eq!(config.worker_exe, Some(PathBuf::from("/opt/paragrep")));
    }
}
