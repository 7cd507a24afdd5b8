use thiserror::Error;

use super::task::TaskError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("runner failed: {0}")]
    Runner(#[from] RunnerError),
    #[error("key edit failed: {0}")]
    KeyEdit(#[from] KeyEditError),
    #[error("task failed: {0}")]
    Task(#[from] TaskError),
    #[error("operation failed: {0}")]
    Operation(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("config error: {0}")]
    Config(String),
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("stream io error: {stream} {source}")]
    StreamIo {
        stream: &'static str,
        source: std::io::Error,
    },
    #[error("timed out after {0} ms")]
    Timeout(u64),
    #[error("plugin error: {0}")]
    Plugin(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum KeyEditError {
    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),
    #[error("illegal subkey index {index} (key has {count} keys)")]
    InvalidSubkeyIndex { index: usize, count: usize },
    #[error("illegal revocation reason code: {0}")]
    InvalidReasonCode(u8),
    #[error("unknown channel: {0}")]
    UnknownChannel(i32),
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("missing tool path: {0}")]
    MissingTool(&'static str),
    #[error("key listing failed: {0}")]
    Listing(#[from] RunnerError),
}
