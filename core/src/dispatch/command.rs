use std::fmt;

use serde::{Deserialize, Serialize};

/// One-shot `gpgconf` operations run against every key database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpgconfCommand {
    ClearPasswordCache,
    ReloadComponents,
    KillAll,
    LaunchAll,
    ResetConfigures,
}

impl GpgconfCommand {
    /// Arguments following `--homedir <path>`.
    pub fn args(self) -> &'static [&'static str] {
        match self {
            GpgconfCommand::ClearPasswordCache => &["--reload", "gpg-agent"],
            GpgconfCommand::ReloadComponents => &["--reload", "all"],
            GpgconfCommand::KillAll => &["--kill", "all"],
            GpgconfCommand::LaunchAll => &["--launch", "all"],
            GpgconfCommand::ResetConfigures => &["--apply-defaults"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GpgconfCommand::ClearPasswordCache => "clear_password_cache",
            GpgconfCommand::ReloadComponents => "reload_components",
            GpgconfCommand::KillAll => "kill_all",
            GpgconfCommand::LaunchAll => "launch_all",
            GpgconfCommand::ResetConfigures => "reset_configures",
        }
    }
}

impl fmt::Display for GpgconfCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
