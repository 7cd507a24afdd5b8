use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub tasks: TaskConfig,

    /// Independent GnuPG home directories. The position in this list is the
    /// channel id.
    #[serde(default)]
    pub key_databases: Vec<KeyDatabaseConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            engine: EngineConfig::default(),
            dispatch: DispatchConfig::default(),
            tasks: TaskConfig::default(),
            key_databases: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "gpgdrive_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path of the `gpg` binary used for key listing and interactive edits.
    #[serde(default = "default_gpg_path")]
    pub gpg_path: Option<String>,

    /// Path of `gpgconf`. Component operations refuse to run without it.
    #[serde(default = "default_gpgconf_path")]
    pub gpgconf_path: Option<String>,

    /// Max wait for the next prompt during an interactive edit.
    #[serde(default = "default_turn_timeout_ms")]
    pub turn_timeout_ms: u64,

    /// Answers given while in the error state before the session is forced to quit.
    #[serde(default = "default_max_error_turns")]
    pub max_error_turns: u32,

    /// Time granted to the engine to exit after stdin is closed, before kill.
    #[serde(default = "default_abort_grace_ms")]
    pub abort_grace_ms: u64,
}

fn default_gpg_path() -> Option<String> {
    Some("gpg".to_string())
}

fn default_gpgconf_path() -> Option<String> {
    Some("gpgconf".to_string())
}

fn default_turn_timeout_ms() -> u64 {
    120_000
}

fn default_max_error_turns() -> u32 {
    3
}

fn default_abort_grace_ms() -> u64 {
    2_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gpg_path: default_gpg_path(),
            gpgconf_path: default_gpgconf_path(),
            turn_timeout_ms: default_turn_timeout_ms(),
            max_error_turns: default_max_error_turns(),
            abort_grace_ms: default_abort_grace_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Per-channel command timeout. 0 disables it.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

fn default_command_timeout_ms() -> u64 {
    30_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskConfig {
    /// Worker pool size; defaults to the number of CPUs.
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyDatabaseConfig {
    pub name: String,
    pub path: String,
}
