use std::sync::Arc;

use crate::automaton::AutomatonOptions;
use crate::channel::{ChannelContext, ChannelSource, ContextManager};
use crate::config::{AppConfig, RuntimeValues, CORE_NAMESPACE, GPGCONF_PATH_KEY, GPG_PATH_KEY};
use crate::dispatch::MultiChannelDispatcher;
use crate::error::{KeyEditError, RunnerError, TaskError};
use crate::keys::KeyManager;
use crate::runner::{CommandExecutor, SessionLauncher};
use crate::task::TaskScheduler;

#[derive(Clone)]
pub struct Services {
    pub executor: Arc<dyn CommandExecutor>,
    pub launcher: Arc<dyn SessionLauncher>,
    pub channels: Arc<dyn ChannelSource>,
}

#[async_trait::async_trait]
pub trait ServicesFactory: Send + Sync {
    async fn build_services(&self, cfg: &AppConfig) -> Result<Services, RunnerError>;
}

#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    runtime: Arc<RuntimeValues>,
    contexts: Arc<ContextManager>,
    services: Services,
}

impl AppContext {
    /// Registers the configured tool paths, builds the services and
    /// initialises the channel registry.
    pub async fn new(
        cfg: AppConfig,
        services_factory: Arc<dyn ServicesFactory>,
    ) -> Result<Self, RunnerError> {
        let runtime = Arc::new(RuntimeValues::new());
        if let Some(p) = cfg.engine.gpgconf_path.as_deref() {
            runtime.set(CORE_NAMESPACE, GPGCONF_PATH_KEY, p);
        }
        if let Some(p) = cfg.engine.gpg_path.as_deref() {
            runtime.set(CORE_NAMESPACE, GPG_PATH_KEY, p);
        }

        let services = services_factory.build_services(&cfg).await?;
        Ok(Self::with_services(cfg, runtime, services))
    }

    pub fn with_services(
        cfg: AppConfig,
        runtime: Arc<RuntimeValues>,
        services: Services,
    ) -> Self {
        let contexts = Arc::new(ContextManager::new());
        contexts.init(services.channels.as_ref(), runtime.gpg_path());
        Self {
            cfg,
            runtime,
            contexts,
            services,
        }
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn runtime(&self) -> &Arc<RuntimeValues> {
        &self.runtime
    }

    pub fn contexts(&self) -> &Arc<ContextManager> {
        &self.contexts
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn dispatcher(&self) -> MultiChannelDispatcher {
        MultiChannelDispatcher::new(
            self.services.executor.clone(),
            self.services.channels.clone(),
            self.runtime.clone(),
            &self.cfg.dispatch,
        )
    }

    /// The gpg path is read from the runtime values on every call, so later
    /// updates apply to managers built afterwards.
    pub fn key_manager(&self, channel: i32) -> Result<KeyManager, KeyEditError> {
        let registered = self.contexts.channel(channel)?;
        let ctx = Arc::new(ChannelContext {
            info: registered.info.clone(),
            gpg_path: self.runtime.gpg_path(),
        });
        KeyManager::new(
            ctx,
            self.services.executor.clone(),
            self.services.launcher.clone(),
            AutomatonOptions::from(&self.cfg.engine),
        )
    }

    pub fn task_scheduler(&self) -> Result<TaskScheduler, TaskError> {
        TaskScheduler::new(&self.cfg.tasks)
    }

    pub fn teardown(&self) {
        self.contexts.teardown();
    }
}
