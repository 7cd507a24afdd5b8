use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use gpgdrive_core::api::GpgconfCommand;

#[derive(Parser, Debug)]
#[command(
    name = "gpgdrive",
    version,
    about = "Scripted GnuPG key edits and multi-database gpgconf control"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.gpgdrive/config.toml or ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the configured key databases.
    Channels,
    /// Set the owner trust of a key (1 = unknown .. 5 = ultimate).
    Trust(TrustArgs),
    /// Delete one subkey of a key.
    Delkey(DelkeyArgs),
    /// Revoke one subkey of a key.
    Revkey(RevkeyArgs),
    /// Run a gpgconf component operation on every key database.
    Components(ComponentsArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct TrustArgs {
    #[arg(long, default_value_t = 0)]
    pub channel: i32,

    pub fingerprint: String,

    #[arg(allow_negative_numbers = true)]
    pub level: i32,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DelkeyArgs {
    #[arg(long, default_value_t = 0)]
    pub channel: i32,

    pub fingerprint: String,

    /// Subkey position as listed by gpg (the primary key is 0).
    pub index: usize,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RevkeyArgs {
    #[arg(long, default_value_t = 0)]
    pub channel: i32,

    pub fingerprint: String,

    /// Subkey position as listed by gpg (the primary key is 0).
    pub index: usize,

    /// Revocation reason: 0 none, 1 compromised, 2 superseded, 3 no longer used.
    #[arg(long, default_value_t = 0)]
    pub code: u8,

    /// Free-form reason. A newline, or the two characters `\n`, starts a new line.
    #[arg(long, default_value = "")]
    pub text: String,
}

impl RevkeyArgs {
    /// `--text` with `\n` escapes turned into real newlines.
    pub fn reason_text(&self) -> String {
        self.text.replace("\\n", "\n")
    }
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentAction {
    ClearCache,
    Reload,
    Kill,
    Launch,
    Reset,
    Restart,
}

impl ComponentAction {
    /// `None` for `restart`, which is a kill followed by a launch.
    pub fn gpgconf_command(self) -> Option<GpgconfCommand> {
        match self {
            ComponentAction::ClearCache => Some(GpgconfCommand::ClearPasswordCache),
            ComponentAction::Reload => Some(GpgconfCommand::ReloadComponents),
            ComponentAction::Kill => Some(GpgconfCommand::KillAll),
            ComponentAction::Launch => Some(GpgconfCommand::LaunchAll),
            ComponentAction::Reset => Some(GpgconfCommand::ResetConfigures),
            ComponentAction::Restart => None,
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ComponentsArgs {
    #[arg(value_enum)]
    pub action: ComponentAction,
}
