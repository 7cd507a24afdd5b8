use async_trait::async_trait;
use gpgdrive_core::api::{CommandExecutor, CommandOutput, CommandSpec, RunnerError};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

/// One-shot commands (`gpgconf`, `gpg --list-keys`) with captured output.
pub struct ProcessCommandExecutor {}

impl ProcessCommandExecutor {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ProcessCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    fn name(&self) -> &str {
        "process"
    }

    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, RunnerError> {
        let started = Instant::now();
        let output = Command::new(&spec.program)
            .args(&spec.args)
            .envs(&spec.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RunnerError::Spawn(format!("{}: {e}", spec.program)))?;

        let out = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            duration_ms: Some(started.elapsed().as_millis() as u64),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(
            command = %spec.display(),
            exit_code = out.exit_code,
            duration_ms = out.duration_ms,
            "command finished"
        );
        Ok(out)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_exit_code_and_streams() {
        let exec = ProcessCommandExecutor::new();
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .env("LC_ALL", "C");
        let out = exec.execute(&spec).await.unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(!out.success());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let exec = ProcessCommandExecutor::new();
        let spec = CommandSpec::new("/nonexistent/definitely-not-gpgconf");
        let err = exec.execute(&spec).await.unwrap_err();
        assert!(matches!(err, RunnerError::Spawn(_)));
    }
}
