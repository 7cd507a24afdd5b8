//! CLI command handlers: key edits run as pool tasks, component operations
//! fan out over every key database.
use std::sync::{Arc, Mutex};

use gpgdrive_core::api as core_api;
use serde::Serialize;

use crate::commands::cli::ComponentAction;

/// Exit code when the engine ran but reported failure.
pub const EXIT_OPERATION_FAILED: i32 = 30;

#[derive(Debug, Clone)]
pub enum KeyEdit {
    Trust { level: i32 },
    DeleteSubkey { index: usize },
    RevokeSubkey { index: usize, code: u8, text: String },
}

impl KeyEdit {
    fn name(&self) -> &'static str {
        match self {
            KeyEdit::Trust { .. } => "set_owner_trust",
            KeyEdit::DeleteSubkey { .. } => "delete_subkey",
            KeyEdit::RevokeSubkey { .. } => "revoke_subkey",
        }
    }

    async fn apply(
        &self,
        km: &core_api::KeyManager,
        key: &core_api::KeyHandle,
    ) -> Result<bool, core_api::KeyEditError> {
        match self {
            KeyEdit::Trust { level } => km.set_owner_trust(key, *level).await,
            KeyEdit::DeleteSubkey { index } => km.delete_subkey(key, *index).await,
            KeyEdit::RevokeSubkey { index, code, text } => {
                km.revoke_subkey(key, *index, *code, text).await
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct EditReport {
    channel: i32,
    operation: &'static str,
    fingerprint: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<core_api::KeyHandle>,
}

#[derive(Debug, Serialize)]
struct ChannelLine {
    channel: i32,
    name: String,
    path: String,
}

pub fn list_channels(ctx: &core_api::AppContext, json: bool) -> Result<i32, core_api::CliError> {
    let mut lines = Vec::new();
    for id in ctx.contexts().channel_ids() {
        let c = ctx.contexts().channel(id)?;
        lines.push(ChannelLine {
            channel: id,
            name: c.info.name.clone(),
            path: c.info.home_dir().to_string_lossy().to_string(),
        });
    }

    if json {
        print_json(&lines)?;
    } else {
        for l in &lines {
            println!("{}: {} ({})", l.channel, l.name, l.path);
        }
    }
    Ok(0)
}

/// Looks the key up, runs the edit on the task pool and prints the outcome
/// together with the key as read back afterwards.
#[tracing::instrument(name = "cli.key_edit", skip(ctx, edit), fields(op = edit.name()))]
pub async fn run_key_edit(
    ctx: &core_api::AppContext,
    channel: i32,
    fingerprint: &str,
    edit: KeyEdit,
    json: bool,
) -> Result<i32, core_api::CliError> {
    let km = ctx.key_manager(channel)?;
    let key = km.get_key(fingerprint).await?;
    let operation = edit.name();

    let scheduler = ctx.task_scheduler()?;
    let mut owner = core_api::TaskOwner::new("cli");
    let result: Arc<Mutex<Option<core_api::TaskData>>> = Arc::new(Mutex::new(None));

    let rt = tokio::runtime::Handle::current();
    let edit_key = key.clone();
    let slot = result.clone();
    let task = owner
        .task(operation, move |data| {
            match rt.block_on(edit.apply(&km, &edit_key)) {
                Ok(ok) => {
                    *data = serde_json::json!({ "success": ok });
                    if ok {
                        0
                    } else {
                        1
                    }
                }
                Err(e) => {
                    *data = serde_json::json!({ "success": false, "error": e.to_string() });
                    -1
                }
            }
        })
        .with_callback(move |rc, data| {
            tracing::debug!(rc, "key edit task completed");
            if let Ok(mut guard) = slot.lock() {
                *guard = Some(data);
            }
        });

    scheduler.submit(task, false)?;
    let ended = owner.next().await;
    scheduler.shutdown();
    tracing::debug!(event = ?ended, "key edit task ended");

    let data = result.lock().ok().and_then(|mut g| g.take());
    let success = data
        .as_ref()
        .and_then(|d| d.get("success"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let error = match data.as_ref().and_then(|d| d.get("error")) {
        Some(e) => e.as_str().map(str::to_string),
        None if data.is_none() => Some("key edit task did not complete".to_string()),
        None => None,
    };

    // The edit may have changed trust or subkeys, so read the key again.
    let reread = match ctx.key_manager(channel)?.get_key(&key.fingerprint).await {
        Ok(k) => Some(k),
        Err(e) => {
            tracing::warn!(error = %e, "re-reading key after edit failed");
            None
        }
    };

    let report = EditReport {
        channel,
        operation,
        fingerprint: key.fingerprint.clone(),
        success,
        error,
        key: reread,
    };
    if json {
        print_json(&report)?;
    } else {
        print_edit_report(&report);
    }

    Ok(if success { 0 } else { EXIT_OPERATION_FAILED })
}

fn print_edit_report(r: &EditReport) {
    let status = if r.success { "ok" } else { "FAILED" };
    println!(
        "{} on {} (channel {}): {}",
        r.operation,
        core_api::beautify_fingerprint(&r.fingerprint),
        r.channel,
        status
    );
    if let Some(e) = &r.error {
        println!("  error: {e}");
    }
    if let Some(k) = &r.key {
        println!("  owner trust: {:?}", k.owner_trust);
        for uid in &k.user_ids {
            println!("  uid: {uid}");
        }
        for (i, s) in k.subkeys.iter().enumerate() {
            let mut flags = Vec::new();
            if s.revoked {
                flags.push("revoked");
            }
            if !s.capabilities.is_empty() {
                flags.push(s.capabilities.as_str());
            }
            let created = s
                .created_at()
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string());
            let expires = s
                .expires_at()
                .map(|t| format!(" expires {}", t.format("%Y-%m-%d")))
                .unwrap_or_default();
            println!(
                "  [{i}] {} {}/{} {created}{expires} {}",
                s.key_id,
                s.algorithm,
                s.length,
                flags.join(" ")
            );
        }
    }
}

/// Runs one gpgconf operation on every key database. Ctrl-C cancels the
/// batch; the aggregate is still reported.
#[tracing::instrument(name = "cli.components", skip(ctx))]
pub async fn run_components(
    ctx: &core_api::AppContext,
    action: ComponentAction,
    json: bool,
) -> Result<i32, core_api::CliError> {
    let dispatcher = ctx.dispatcher();
    let on_complete = |o: core_api::DispatchOutcome| {
        tracing::info!(
            operation = %o.operation,
            success = o.success,
            channels = o.results.len(),
            "component operation finished"
        );
    };

    let handle = match action.gpgconf_command() {
        Some(cmd) => dispatcher.run(cmd, on_complete),
        None => dispatcher.restart_all(on_complete),
    };

    let token = handle.cancellation_token();
    let finished = handle.finished();
    tokio::pin!(finished);
    let outcome = tokio::select! {
        o = &mut finished => o,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, cancelling component operation");
            token.cancel();
            finished.await
        }
    };

    if json {
        print_json(&outcome)?;
    } else {
        println!(
            "{}: {}{}",
            outcome.operation,
            if outcome.success { "ok" } else { "FAILED" },
            if outcome.cancelled { " (cancelled)" } else { "" }
        );
        if let Some(e) = &outcome.error {
            println!("  error: {e}");
        }
        for r in &outcome.results {
            let stderr = r.stderr.trim();
            if stderr.is_empty() {
                println!("  {}: {} exit {}", r.channel, r.name, r.exit_code);
            } else {
                println!(
                    "  {}: {} exit {} ({stderr})",
                    r.channel, r.name, r.exit_code
                );
            }
        }
    }

    Ok(if outcome.success {
        0
    } else {
        EXIT_OPERATION_FAILED
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), core_api::CliError> {
    let s = serde_json::to_string_pretty(value)
        .map_err(|e| core_api::CliError::Command(format!("json encode failed: {e}")))?;
    println!("{s}");
    Ok(())
}
