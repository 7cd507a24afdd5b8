use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::RunnerError;

use super::types::{CommandOutput, CommandSpec, Signal};

/// Runs a program to completion and captures its output.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    fn name(&self) -> &str;
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError>;
}

/// A live child process with piped stdio, used for line-oriented dialogues.
#[async_trait]
pub trait InteractiveSession: Send {
    fn stdin(&mut self) -> Option<Box<dyn AsyncWrite + Unpin + Send>>;
    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>>;
    async fn signal(&mut self, signal: Signal) -> anyhow::Result<()>;
    /// Waits for exit and returns the exit code (-1 when killed by a signal).
    async fn wait(&mut self) -> anyhow::Result<i32>;
}

#[async_trait]
pub trait SessionLauncher: Send + Sync {
    fn name(&self) -> &str;
    async fn start_session(&self, spec: &CommandSpec)
        -> anyhow::Result<Box<dyn InteractiveSession>>;
}
