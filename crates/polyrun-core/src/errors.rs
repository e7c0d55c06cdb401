//! Error types for failure handling across the execution router.
//!
//! Errors stay structured (`ExecError`) while a job is being processed and
//! are folded into the uniform textual result only at each backend's outer
//! boundary. Variants are grouped by origin: engine boot, request shape,
//! the remote transport. Errors raised by the executed program itself are
//! not represented here; they reach the caller through the error-channel
//! output sink, prefixed but otherwise indistinguishable from output.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ExecError {
    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("Entry file not found: {0}")]
    EntryFileMissing(String),
    #[error("Remote execution failed: {0}")]
    Transport(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ExecError {
    fn from(err: std::io::Error) -> Self {
        ExecError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for ExecError {
    fn from(err: reqwest::Error) -> Self {
        ExecError::Transport(err.to_string())
    }
}
