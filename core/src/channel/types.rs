use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One independent key database (a GnuPG home directory).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDatabaseInfo {
    pub channel: i32,
    pub name: String,
    pub path: PathBuf,
}

impl KeyDatabaseInfo {
    pub fn new(channel: i32, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            channel,
            name: name.into(),
            path: path.into(),
        }
    }

    /// Canonical home directory for `--homedir`. Falls back to the configured
    /// path when it cannot be resolved (e.g. the directory does not exist yet).
    pub fn home_dir(&self) -> PathBuf {
        match std::fs::canonicalize(&self.path) {
            Ok(p) => strip_verbatim(p),
            Err(e) => {
                tracing::warn!(
                    channel = self.channel,
                    path = %self.path.display(),
                    error = %e,
                    "cannot canonicalize key database path, using it as configured"
                );
                self.path.clone()
            }
        }
    }
}

impl fmt::Display for KeyDatabaseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.channel, self.name)
    }
}

// `canonicalize` yields `\\?\C:\...` on Windows, which gpgconf does not accept.
fn strip_verbatim(p: PathBuf) -> PathBuf {
    let s = p.to_string_lossy();
    match s.strip_prefix(r"\\?\") {
        Some(rest) => Path::new(rest).to_path_buf(),
        None => p,
    }
}
