use clap::Parser;
mod app;
mod commands;
use commands::cli;
use gpgdrive_core::context::AppContext;
use gpgdrive_core::error;
use gpgdrive_plugins::services::PluginServicesFactory;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, error::CliError> {
    let args = cli::Args::parse();
    let cfg = match args.config.as_deref() {
        Some(path) => gpgdrive_core::config::load_from_path(path),
        None => gpgdrive_core::config::load_default(),
    }
    .map_err(|e| error::CliError::Config(e.to_string()))?;
    init_tracing(&cfg.logging).map_err(error::CliError::Command)?;

    let ctx = AppContext::new(cfg, Arc::new(PluginServicesFactory))
        .await
        .map_err(error::CliError::Runner)?;

    let json = args.json;
    let exit = dispatch(args.command, json, &ctx).await;
    ctx.teardown();
    exit
}

fn exit_code_for_error(e: &error::CliError) -> i32 {
    // 0: success
    // 11: config error / missing tool
    // 20: runner start / IO error
    // 30: the operation ran and failed (usually returned as a normal exit code)
    // 50: internal/uncategorized
    match e {
        error::CliError::Config(_) => 11,
        error::CliError::Runner(re) => runner_exit_code(re),
        error::CliError::KeyEdit(ke) => match ke {
            error::KeyEditError::MissingTool(_) => 11,
            error::KeyEditError::Listing(re) => runner_exit_code(re),
            _ => 30,
        },
        error::CliError::Operation(_) => 30,
        error::CliError::Task(_) => 50,
        error::CliError::Io(_) => 20,
        error::CliError::Command(_) => 20,
        error::CliError::Anyhow(_) => 50,
    }
}

fn runner_exit_code(e: &error::RunnerError) -> i32 {
    match e {
        error::RunnerError::Config(_) => 11,
        error::RunnerError::Spawn(_) => 20,
        error::RunnerError::StreamIo { .. } => 20,
        error::RunnerError::Timeout(_) => 20,
        error::RunnerError::Plugin(_) => 50,
    }
}

async fn dispatch(
    cmd: cli::Commands,
    json: bool,
    ctx: &AppContext,
) -> Result<i32, error::CliError> {
    match cmd {
        cli::Commands::Channels => app::list_channels(ctx, json),
        cli::Commands::Trust(a) => {
            let edit = app::KeyEdit::Trust { level: a.level };
            app::run_key_edit(ctx, a.channel, &a.fingerprint, edit, json).await
        }
        cli::Commands::Delkey(a) => {
            let edit = app::KeyEdit::DeleteSubkey { index: a.index };
            app::run_key_edit(ctx, a.channel, &a.fingerprint, edit, json).await
        }
        cli::Commands::Revkey(a) => {
            let edit = app::KeyEdit::RevokeSubkey {
                index: a.index,
                code: a.code,
                text: a.reason_text(),
            };
            app::run_key_edit(ctx, a.channel, &a.fingerprint, edit, json).await
        }
        cli::Commands::Components(a) => app::run_components(ctx, a.action, json).await,
    }
}

fn init_tracing(logging: &gpgdrive_core::config::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("gpgdrive"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("gpgdrive.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
