use std::path::{Path, PathBuf};

use super::types::{AppConfig, KeyDatabaseConfig};

/// Get the default gpgdrive data directory: ~/.gpgdrive
pub fn get_gpgdrive_data_dir() -> anyhow::Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".gpgdrive"))
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))
}

/// The GnuPG home used when no key database is configured.
pub fn default_gnupg_home() -> anyhow::Result<PathBuf> {
    if let Ok(v) = std::env::var("GNUPGHOME") {
        if !v.trim().is_empty() {
            return Ok(PathBuf::from(v));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".gnupg"))
        .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.gpgdrive/config.toml (highest)
    let data_dir = get_gpgdrive_data_dir()?;
    let user_config = data_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let cfg: AppConfig = if user_config.exists() {
        load_file(&user_config)?
    } else if local_config.exists() {
        load_file(local_config)?
    } else {
        AppConfig::default()
    };

    finalize(cfg)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    finalize(load_file(path)?)
}

pub fn load_from_str(s: &str) -> anyhow::Result<AppConfig> {
    finalize(toml::from_str::<AppConfig>(s)?)
}

fn load_file(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    Ok(toml::from_str::<AppConfig>(&s)?)
}

fn finalize(mut cfg: AppConfig) -> anyhow::Result<AppConfig> {
    if cfg.key_databases.is_empty() {
        cfg.key_databases.push(KeyDatabaseConfig {
            name: "Default".to_string(),
            path: default_gnupg_home()?.to_string_lossy().to_string(),
        });
    }

    for db in cfg.key_databases.iter_mut() {
        db.path = shellexpand::tilde(&db.path).into_owned();
    }

    // Environment variable overrides (Priority 0: highest)
    if let Ok(v) = std::env::var("GPGDRIVE_GPG_PATH") {
        if !v.trim().is_empty() {
            cfg.engine.gpg_path = Some(v);
        }
    }
    if let Ok(v) = std::env::var("GPGDRIVE_GPGCONF_PATH") {
        if !v.trim().is_empty() {
            cfg.engine.gpgconf_path = Some(v);
        }
    }

    // An empty string in the file means "not available".
    for p in [&mut cfg.engine.gpg_path, &mut cfg.engine.gpgconf_path] {
        if p.as_deref().map(str::trim).map(str::is_empty).unwrap_or(false) {
            *p = None;
        }
    }

    Ok(cfg)
}
