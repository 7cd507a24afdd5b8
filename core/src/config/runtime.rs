use std::collections::HashMap;
use std::sync::RwLock;

/// Namespace for values registered by the core at start-up.
pub const CORE_NAMESPACE: &str = "core";
pub const GPGCONF_PATH_KEY: &str = "gpgme.ctx.gpgconf_path";
pub const GPG_PATH_KEY: &str = "gpgme.ctx.app_path";

/// Namespaced key-value store for values resolved at runtime (tool paths,
/// engine versions). Read fresh by every operation that depends on them.
#[derive(Debug, Default)]
pub struct RuntimeValues {
    values: RwLock<HashMap<(String, String), String>>,
}

impl RuntimeValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, namespace: &str, key: &str, value: impl Into<String>) {
        let mut g = self.values.write().unwrap_or_else(|p| p.into_inner());
        g.insert((namespace.to_string(), key.to_string()), value.into());
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
    }

    pub fn remove(&self, namespace: &str, key: &str) -> Option<String> {
        let mut g = self.values.write().unwrap_or_else(|p| p.into_inner());
        g.remove(&(namespace.to_string(), key.to_string()))
    }

    pub fn gpgconf_path(&self) -> Option<String> {
        self.get(CORE_NAMESPACE, GPGCONF_PATH_KEY)
            .filter(|p| !p.trim().is_empty())
    }

    pub fn gpg_path(&self) -> Option<String> {
        self.get(CORE_NAMESPACE, GPG_PATH_KEY)
            .filter(|p| !p.trim().is_empty())
    }
}
