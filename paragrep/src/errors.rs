use std::io;
use std::process::ExitStatus;

/// Error type covering every fatal condition in a scan run.
///
/// There is no local recovery anywhere in the pipeline: argument problems,
/// pattern compilation, file and pipe I/O, malformed frames, and worker exit
/// statuses all propagate here and end the run with a non-zero exit code.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("worker {id} exited with {status}")]
    Worker { id: u32, status: ExitStatus },
}

impl ScanError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        ScanError::Config(msg.into())
    }

    pub fn protocol_error(msg: impl Into<String>) -> Self {
        ScanError::Protocol(msg.into())
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
