use std::sync::Arc;

use gpgdrive_core::api::{
    AppConfig, ChannelSource, CommandExecutor, ConfigChannelSource, SessionLauncher,
};

use crate::runner::{ProcessCommandExecutor, ProcessSessionLauncher};

pub fn build_executor(_cfg: &AppConfig) -> Arc<dyn CommandExecutor> {
    Arc::new(ProcessCommandExecutor::new())
}

pub fn build_launcher(_cfg: &AppConfig) -> Arc<dyn SessionLauncher> {
    Arc::new(ProcessSessionLauncher::new())
}

pub fn build_channel_source(cfg: &AppConfig) -> Arc<dyn ChannelSource> {
    Arc::new(ConfigChannelSource::new(cfg.key_databases.clone()))
}
