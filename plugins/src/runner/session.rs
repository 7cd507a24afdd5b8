use anyhow::Result;
use async_trait::async_trait;
use gpgdrive_core::api::{CommandSpec, InteractiveSession, SessionLauncher, Signal};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};

/// Spawns the engine with all three stdio streams piped.
pub struct ProcessSessionLauncher {}

impl ProcessSessionLauncher {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ProcessSessionLauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionLauncher for ProcessSessionLauncher {
    fn name(&self) -> &str {
        "process"
    }

    async fn start_session(&self, spec: &CommandSpec) -> Result<Box<dyn InteractiveSession>> {
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .envs(&spec.envs)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        tracing::debug!(pid = ?child.id(), program = %spec.program, "engine session spawned");
        Ok(Box::new(ProcessSession { child }))
    }
}

struct ProcessSession {
    child: Child,
}

#[async_trait]
impl InteractiveSession for ProcessSession {
    fn stdin(&mut self) -> Option<Box<dyn AsyncWrite + Unpin + Send>> {
        self.child
            .stdin
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncWrite + Unpin + Send>)
    }

    fn stdout(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    fn stderr(&mut self) -> Option<Box<dyn AsyncRead + Unpin + Send>> {
        self.child
            .stderr
            .take()
            .map(|s| Box::new(s) as Box<dyn AsyncRead + Unpin + Send>)
    }

    async fn signal(&mut self, signal: Signal) -> Result<()> {
        // tokio only exposes SIGKILL / TerminateProcess; Term degrades to it.
        tracing::debug!(?signal, pid = ?self.child.id(), "signalling engine");
        self.child.start_kill()?;
        Ok(())
    }

    async fn wait(&mut self) -> Result<i32> {
        let status = self.child.wait().await?;
        Ok(status.code().unwrap_or(-1))
    }
}
