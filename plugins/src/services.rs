//! ServicesFactory implementation: builds the process-backed executor, session launcher
//! and channel source from the configuration, for reuse by the CLI.
use async_trait::async_trait;
use gpgdrive_core::api::{AppConfig, RunnerError, Services, ServicesFactory};

use crate::factory;

pub struct PluginServicesFactory;

impl Default for PluginServicesFactory {
    fn default() -> Self {
        Self
    }
}

#[async_trait]
impl ServicesFactory for PluginServicesFactory {
    async fn build_services(&self, cfg: &AppConfig) -> Result<Services, RunnerError> {
        if cfg.engine.gpg_path.is_none() && cfg.engine.gpgconf_path.is_none() {
            return Err(RunnerError::Config(
                "neither engine.gpg_path nor engine.gpgconf_path is configured".into(),
            ));
        }
        Ok(Services {
            executor: factory::build_executor(cfg),
            launcher: factory::build_launcher(cfg),
            channels: factory::build_channel_source(cfg),
        })
    }
}
