//! Drives one interactive `gpg --edit-key` session through caller-supplied
//! transition and action tables.
//!
//! ```text
//! status line ──► StatusEvent ──► next_state(state, keyword, args)
//!                                      │
//!                                      ▼
//!                           action(flags, new_state) ──► stdin
//! ```
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::config::EngineConfig;
use crate::runner::{pump_lines, CommandSpec, LineStream, LineTap, SessionLauncher, Signal};
use crate::util::RingBytes;

use super::state::AutomatonState;
use super::status::StatusEvent;

const TAIL_BYTES: usize = 4 * 1024;

/// Flags an action may raise while answering a prompt.
#[derive(Debug, Default, Clone)]
pub struct InteractionFlags {
    success: bool,
}

impl InteractionFlags {
    pub fn set_success(&mut self, success: bool) {
        self.success = success;
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

/// A scripted dialogue: a pure transition table plus a (possibly stateful)
/// action table.
pub trait EditScript: Send {
    fn next_state(state: AutomatonState, status: &str, args: &str) -> AutomatonState
    where
        Self: Sized;

    fn action(&mut self, flags: &mut InteractionFlags, state: AutomatonState) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    Spawn(String),
    MissingPipe(&'static str),
    TurnTimeout,
    ErrorLimit,
    StdinClosed(String),
    Wait(String),
}

#[derive(Debug, Clone)]
pub struct InteractionReport {
    pub success_flagged: bool,
    pub final_state: AutomatonState,
    pub exit_code: Option<i32>,
    pub prompts: usize,
    pub abort: Option<AbortReason>,
    pub stdout_tail: String,
    pub stderr_tail: String,
}

impl InteractionReport {
    fn aborted(reason: AbortReason) -> Self {
        Self {
            success_flagged: false,
            final_state: AutomatonState::Start,
            exit_code: None,
            prompts: 0,
            abort: Some(reason),
            stdout_tail: String::new(),
            stderr_tail: String::new(),
        }
    }

    /// Success was flagged, the run did not end in ERROR, and the engine
    /// exited cleanly on its own.
    pub fn succeeded(&self) -> bool {
        self.success_flagged
            && self.abort.is_none()
            && !self.final_state.is_error()
            && self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone)]
pub struct AutomatonOptions {
    pub turn_timeout: Duration,
    pub max_error_turns: u32,
    pub abort_grace: Duration,
}

impl Default for AutomatonOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for AutomatonOptions {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            turn_timeout: Duration::from_millis(cfg.turn_timeout_ms),
            max_error_turns: cfg.max_error_turns,
            abort_grace: Duration::from_millis(cfg.abort_grace_ms),
        }
    }
}

/// Interactive driver bound to one key database.
pub struct Automaton {
    launcher: Arc<dyn SessionLauncher>,
    gpg_path: String,
    home_dir: PathBuf,
    opts: AutomatonOptions,
}

enum LoopEnd {
    Exited(anyhow::Result<i32>),
    Abort(AbortReason),
}

impl Automaton {
    pub fn new(
        launcher: Arc<dyn SessionLauncher>,
        gpg_path: impl Into<String>,
        home_dir: impl Into<PathBuf>,
        opts: AutomatonOptions,
    ) -> Self {
        Self {
            launcher,
            gpg_path: gpg_path.into(),
            home_dir: home_dir.into(),
            opts,
        }
    }

    pub fn edit_spec(&self, target: &str) -> CommandSpec {
        CommandSpec::new(&self.gpg_path)
            .arg("--homedir")
            .arg(self.home_dir.to_string_lossy())
            .args([
                "--no-tty",
                "--with-colons",
                "--status-fd",
                "1",
                "--command-fd",
                "0",
                "--edit-key",
            ])
            .arg(target)
            .env("LC_ALL", "C")
    }

    /// Runs one full dialogue against `target`. Blocks the calling task until
    /// the engine exits or the session is aborted.
    pub async fn interact<N, A>(&self, target: &str, next_state: N, action: A) -> bool
    where
        N: Fn(AutomatonState, &str, &str) -> AutomatonState,
        A: FnMut(&mut InteractionFlags, AutomatonState) -> String,
    {
        self.interact_report(target, next_state, action)
            .await
            .succeeded()
    }

    pub async fn run_script<S: EditScript>(&self, target: &str, mut script: S) -> bool {
        self.interact(target, S::next_state, |flags, state| {
            script.action(flags, state)
        })
        .await
    }

    #[tracing::instrument(name = "automaton.interact", skip_all, fields(key = %target))]
    pub async fn interact_report<N, A>(
        &self,
        target: &str,
        next_state: N,
        mut action: A,
    ) -> InteractionReport
    where
        N: Fn(AutomatonState, &str, &str) -> AutomatonState,
        A: FnMut(&mut InteractionFlags, AutomatonState) -> String,
    {
        let spec = self.edit_spec(target);
        tracing::debug!(command = %spec.display(), "starting interactive session");

        let mut session = match self.launcher.start_session(&spec).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error.kind = "automaton.spawn", error.message = %e);
                return InteractionReport::aborted(AbortReason::Spawn(e.to_string()));
            }
        };

        let Some(stdin) = session.stdin() else {
            return InteractionReport::aborted(AbortReason::MissingPipe("stdin"));
        };
        let Some(stdout) = session.stdout() else {
            return InteractionReport::aborted(AbortReason::MissingPipe("stdout"));
        };
        let Some(stderr) = session.stderr() else {
            return InteractionReport::aborted(AbortReason::MissingPipe("stderr"));
        };

        let ring_out = RingBytes::new(TAIL_BYTES);
        let ring_err = RingBytes::new(TAIL_BYTES);
        let (line_tx, mut line_rx) = mpsc::channel::<LineTap>(64);
        let out_task = pump_lines(stdout, ring_out.clone(), line_tx.clone(), LineStream::Stdout);
        let err_task = pump_lines(stderr, ring_err.clone(), line_tx, LineStream::Stderr);

        let mut stdin: Option<Box<dyn AsyncWrite + Unpin + Send>> = Some(stdin);
        let mut state = AutomatonState::Start;
        let mut flags = InteractionFlags::default();
        let mut prompts = 0usize;
        let mut error_turns = 0u32;

        let end = {
            let wait_fut = session.wait();
            tokio::pin!(wait_fut);
            let mut lines_open = true;

            loop {
                if !lines_open {
                    // Both pipes are closed; the process is on its way out.
                    match tokio::time::timeout(self.opts.turn_timeout, &mut wait_fut).await {
                        Ok(res) => break LoopEnd::Exited(res),
                        Err(_) => break LoopEnd::Abort(AbortReason::TurnTimeout),
                    }
                }

                tokio::select! {
                    res = &mut wait_fut => {
                        break LoopEnd::Exited(res);
                    }

                    tap = tokio::time::timeout(self.opts.turn_timeout, line_rx.recv()) => {
                        let tap = match tap {
                            Err(_) => {
                                tracing::warn!(state = %state, "no output from engine within turn timeout");
                                break LoopEnd::Abort(AbortReason::TurnTimeout);
                            }
                            Ok(None) => {
                                lines_open = false;
                                continue;
                            }
                            Ok(Some(tap)) => tap,
                        };

                        if tap.stream == LineStream::Stderr {
                            tracing::debug!(target: "gpgdrive.engine", stream = "stderr", line = %tap.line);
                            continue;
                        }

                        let Some(event) = StatusEvent::parse_line(&tap.line) else {
                            tracing::trace!(target: "gpgdrive.engine", line = %tap.line);
                            continue;
                        };

                        if !event.keyword.is_prompt() {
                            tracing::debug!(keyword = event.keyword.as_str(), args = %event.args, "status");
                            continue;
                        }

                        prompts += 1;
                        let next = next_state(state, event.keyword.as_str(), &event.args);
                        tracing::debug!(
                            from = %state,
                            to = %next,
                            keyword = event.keyword.as_str(),
                            args = %event.args,
                            "transition"
                        );
                        state = next;

                        let answer = if state.is_error() {
                            error_turns += 1;
                            if error_turns > self.opts.max_error_turns {
                                tracing::warn!(error_turns, "error state not recovered, forcing quit");
                                break LoopEnd::Abort(AbortReason::ErrorLimit);
                            }
                            // The error action never counts towards success.
                            let mut scratch = InteractionFlags::default();
                            action(&mut scratch, state)
                        } else {
                            action(&mut flags, state)
                        };

                        let Some(w) = stdin.as_mut() else {
                            break LoopEnd::Abort(AbortReason::StdinClosed("stdin already closed".into()));
                        };
                        if let Err(e) = write_answer(w, &answer).await {
                            tracing::error!(error.kind = "automaton.stdin_broken", error.message = %e);
                            break LoopEnd::Abort(AbortReason::StdinClosed(e.to_string()));
                        }
                    }
                }
            }
        };

        let mut report = InteractionReport {
            success_flagged: flags.success(),
            final_state: state,
            exit_code: None,
            prompts,
            abort: None,
            stdout_tail: String::new(),
            stderr_tail: String::new(),
        };

        match end {
            LoopEnd::Exited(Ok(code)) => report.exit_code = Some(code),
            LoopEnd::Exited(Err(e)) => {
                tracing::error!(error.kind = "automaton.wait", error.message = %e);
                report.abort = Some(AbortReason::Wait(e.to_string()));
            }
            LoopEnd::Abort(reason) => {
                // Closing the command fd makes gpg leave without saving.
                drop(stdin.take());
                report.exit_code =
                    match tokio::time::timeout(self.opts.abort_grace, session.wait()).await {
                        Ok(Ok(code)) => Some(code),
                        _ => {
                            let _ = session.signal(Signal::Kill).await;
                            session.wait().await.ok()
                        }
                    };
                report.abort = Some(reason);
            }
        }

        drop(stdin);
        out_task.await.ok();
        err_task.await.ok();
        report.stdout_tail = ring_out.to_string_lossy();
        report.stderr_tail = ring_err.to_string_lossy();

        if report.succeeded() {
            tracing::info!(prompts = report.prompts, "interactive session succeeded");
        } else {
            tracing::warn!(
                final_state = %report.final_state,
                exit_code = ?report.exit_code,
                abort = ?report.abort,
                success_flagged = report.success_flagged,
                "interactive session failed"
            );
        }
        report
    }
}

async fn write_answer(w: &mut Box<dyn AsyncWrite + Unpin + Send>, answer: &str) -> std::io::Result<()> {
    w.write_all(answer.as_bytes()).await?;
    w.write_all(b"\n").await?;
    w.flush().await
}
