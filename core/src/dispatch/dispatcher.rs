use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::channel::{ChannelSource, KeyDatabaseInfo};
use crate::config::{DispatchConfig, RuntimeValues};
use crate::runner::{CommandExecutor, CommandSpec};

use super::batch::{
    CompletionFn, DispatchBatch, DispatchOutcome, EXIT_CANCELLED, EXIT_TRANSPORT,
};
use super::command::GpgconfCommand;

const RESTART: &str = "restart_all";

/// Handle on an in-flight dispatch.
pub struct DispatchHandle {
    token: CancellationToken,
    done: oneshot::Receiver<DispatchOutcome>,
    operation: String,
}

impl DispatchHandle {
    /// Channels still running record `-2`; the aggregate still fires once.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Waits for the aggregate outcome (the same value handed to the callback).
    pub async fn finished(self) -> DispatchOutcome {
        match self.done.await {
            Ok(outcome) => outcome,
            Err(_) => {
                DispatchOutcome::failed(&self.operation, "dispatch dropped before completion")
            }
        }
    }
}

/// Runs one command against every configured key database concurrently and
/// reports a single aggregate outcome.
#[derive(Clone)]
pub struct MultiChannelDispatcher {
    executor: Arc<dyn CommandExecutor>,
    channels: Arc<dyn ChannelSource>,
    runtime: Arc<RuntimeValues>,
    command_timeout: Option<Duration>,
}

impl MultiChannelDispatcher {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        channels: Arc<dyn ChannelSource>,
        runtime: Arc<RuntimeValues>,
        cfg: &DispatchConfig,
    ) -> Self {
        let command_timeout =
            (cfg.command_timeout_ms > 0).then(|| Duration::from_millis(cfg.command_timeout_ms));
        Self {
            executor,
            channels,
            runtime,
            command_timeout,
        }
    }

    /// Runs `gpgconf <per_channel_args(channel, home)>` once per channel.
    ///
    /// Returns as soon as every channel command has been issued. `on_complete`
    /// runs exactly once, on whichever task finishes last (or immediately
    /// when no channel is configured or gpgconf is unavailable). Must be
    /// called from within a tokio runtime.
    pub fn dispatch_all<A, C>(
        &self,
        operation: &str,
        per_channel_args: A,
        on_complete: C,
    ) -> DispatchHandle
    where
        A: Fn(&KeyDatabaseInfo, &Path) -> Vec<String>,
        C: FnOnce(DispatchOutcome) + Send + 'static,
    {
        let (handle, cb) = self.handle_for(operation, CancellationToken::new(), on_complete);
        self.issue(operation, &per_channel_args, handle.token.clone(), cb);
        handle
    }

    pub fn run(
        &self,
        command: GpgconfCommand,
        on_complete: impl FnOnce(DispatchOutcome) + Send + 'static,
    ) -> DispatchHandle {
        self.dispatch_all(command.as_str(), gpgconf_args(command), on_complete)
    }

    pub fn clear_password_cache(
        &self,
        on_complete: impl FnOnce(DispatchOutcome) + Send + 'static,
    ) -> DispatchHandle {
        self.run(GpgconfCommand::ClearPasswordCache, on_complete)
    }

    pub fn reload_components(
        &self,
        on_complete: impl FnOnce(DispatchOutcome) + Send + 'static,
    ) -> DispatchHandle {
        self.run(GpgconfCommand::ReloadComponents, on_complete)
    }

    pub fn kill_all(
        &self,
        on_complete: impl FnOnce(DispatchOutcome) + Send + 'static,
    ) -> DispatchHandle {
        self.run(GpgconfCommand::KillAll, on_complete)
    }

    pub fn launch_all(
        &self,
        on_complete: impl FnOnce(DispatchOutcome) + Send + 'static,
    ) -> DispatchHandle {
        self.run(GpgconfCommand::LaunchAll, on_complete)
    }

    pub fn reset_configures(
        &self,
        on_complete: impl FnOnce(DispatchOutcome) + Send + 'static,
    ) -> DispatchHandle {
        self.run(GpgconfCommand::ResetConfigures, on_complete)
    }

    /// Kills every component, waits for that to finish on all channels, then
    /// launches them again. Only the launch outcome reaches `on_complete`; a
    /// failed kill does not prevent the launch. Cancelling during the kill
    /// phase skips the launch and reports the kill results as cancelled.
    pub fn restart_all(
        &self,
        on_complete: impl FnOnce(DispatchOutcome) + Send + 'static,
    ) -> DispatchHandle {
        let (handle, cb) = self.handle_for(RESTART, CancellationToken::new(), on_complete);
        if self.runtime.gpgconf_path().is_none() {
            tracing::error!(operation = RESTART, "gpgconf path is not configured");
            cb(DispatchOutcome::failed(RESTART, "gpgconf path is not configured"));
            return handle;
        }

        let this = self.clone();
        let token = handle.token.clone();

        tokio::spawn(async move {
            let (kill_tx, kill_rx) = oneshot::channel();
            this.issue(
                GpgconfCommand::KillAll.as_str(),
                &gpgconf_args(GpgconfCommand::KillAll),
                token.child_token(),
                Box::new(move |o| {
                    let _ = kill_tx.send(o);
                }),
            );
            let kill = kill_rx.await;

            if token.is_cancelled() {
                tracing::info!(operation = RESTART, "cancelled during kill, not launching");
                let mut o = match kill {
                    Ok(o) => o,
                    Err(_) => DispatchOutcome::failed(RESTART, "kill dispatch dropped"),
                };
                o.operation = RESTART.to_string();
                o.success = false;
                o.cancelled = true;
                cb(o);
                return;
            }

            match kill {
                Ok(kill) if !kill.success => {
                    tracing::warn!(
                        error = ?kill.error,
                        "kill before launch failed, launching anyway"
                    );
                }
                Ok(_) => {}
                Err(_) => tracing::warn!("kill dispatch dropped, launching anyway"),
            }

            this.issue(
                GpgconfCommand::LaunchAll.as_str(),
                &gpgconf_args(GpgconfCommand::LaunchAll),
                token,
                Box::new(move |mut o: DispatchOutcome| {
                    o.operation = RESTART.to_string();
                    cb(o);
                }),
            );
        });

        handle
    }

    fn handle_for<C>(
        &self,
        operation: &str,
        token: CancellationToken,
        on_complete: C,
    ) -> (DispatchHandle, CompletionFn)
    where
        C: FnOnce(DispatchOutcome) + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let cb: CompletionFn = Box::new(move |outcome: DispatchOutcome| {
            let copy = outcome.clone();
            on_complete(outcome);
            let _ = tx.send(copy);
        });
        let handle = DispatchHandle {
            token,
            done: rx,
            operation: operation.to_string(),
        };
        (handle, cb)
    }

    fn issue(
        &self,
        operation: &str,
        per_channel_args: &dyn Fn(&KeyDatabaseInfo, &Path) -> Vec<String>,
        token: CancellationToken,
        on_complete: CompletionFn,
    ) {
        let Some(gpgconf) = self.runtime.gpgconf_path() else {
            tracing::error!(operation, "gpgconf path is not configured");
            on_complete(DispatchOutcome::failed(operation, "gpgconf path is not configured"));
            return;
        };

        let channels = self.channels.key_databases();
        // Argument lists and slots are settled before any command starts.
        let specs: Vec<CommandSpec> = channels
            .iter()
            .map(|info| {
                let home = info.home_dir();
                CommandSpec::new(&gpgconf).args(per_channel_args(info, &home))
            })
            .collect();

        let batch = Arc::new(DispatchBatch::new(operation, channels, on_complete));
        if batch.len() == 0 {
            tracing::info!(operation, "no key database configured");
            batch.finish_empty();
            return;
        }

        for (index, spec) in specs.into_iter().enumerate() {
            let batch = batch.clone();
            let executor = self.executor.clone();
            let token = token.clone();
            let command_timeout = self.command_timeout;

            tokio::spawn(async move {
                tracing::debug!(index, command = %spec.display(), "issuing channel command");
                let (code, stderr) = tokio::select! {
                    biased;
                    _ = token.cancelled() => (EXIT_CANCELLED, String::new()),
                    res = run_one(executor.as_ref(), &spec, command_timeout) => res,
                };
                batch.record(index, code, stderr, token.is_cancelled());
            });
        }
    }
}

async fn run_one(
    executor: &dyn CommandExecutor,
    spec: &CommandSpec,
    command_timeout: Option<Duration>,
) -> (i32, String) {
    let res = match command_timeout {
        Some(t) => match tokio::time::timeout(t, executor.execute(spec)).await {
            Ok(res) => res,
            Err(_) => {
                tracing::warn!(
                    command = %spec.display(),
                    timeout_ms = t.as_millis() as u64,
                    "channel command timed out"
                );
                return (EXIT_TRANSPORT, String::new());
            }
        },
        None => executor.execute(spec).await,
    };
    match res {
        Ok(out) => (out.exit_code, out.stderr.trim().to_string()),
        Err(e) => {
            tracing::error!(
                error.kind = "dispatch.transport",
                error.message = %e,
                command = %spec.display()
            );
            (EXIT_TRANSPORT, e.to_string())
        }
    }
}

fn gpgconf_args(command: GpgconfCommand) -> impl Fn(&KeyDatabaseInfo, &Path) -> Vec<String> {
    move |_, home| {
        let mut args = vec!["--homedir".to_string(), home.to_string_lossy().into_owned()];
        args.extend(command.args().iter().map(|a| a.to_string()));
        args
    }
}
