use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::KeyEditError;

use super::source::ChannelSource;
use super::types::KeyDatabaseInfo;

/// Everything a per-channel operation needs to address one key database.
#[derive(Debug, Clone)]
pub struct ChannelContext {
    pub info: KeyDatabaseInfo,
    pub gpg_path: Option<String>,
}

impl ChannelContext {
    pub fn channel(&self) -> i32 {
        self.info.channel
    }
}

/// Process-wide registry of channel contexts with explicit init/teardown.
#[derive(Default)]
pub struct ContextManager {
    channels: RwLock<HashMap<i32, Arc<ChannelContext>>>,
}

impl ContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)builds the registry from `source`. Returns the number of channels.
    pub fn init(&self, source: &dyn ChannelSource, gpg_path: Option<String>) -> usize {
        let fresh: HashMap<i32, Arc<ChannelContext>> = source
            .key_databases()
            .into_iter()
            .map(|info| {
                (
                    info.channel,
                    Arc::new(ChannelContext {
                        info,
                        gpg_path: gpg_path.clone(),
                    }),
                )
            })
            .collect();
        let n = fresh.len();
        let mut g = self.channels.write().unwrap_or_else(|p| p.into_inner());
        *g = fresh;
        tracing::debug!(channels = n, "channel registry initialized");
        n
    }

    pub fn channel(&self, id: i32) -> Result<Arc<ChannelContext>, KeyEditError> {
        self.channels
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&id)
            .cloned()
            .ok_or(KeyEditError::UnknownChannel(id))
    }

    pub fn channel_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .channels
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn teardown(&self) {
        let mut g = self.channels.write().unwrap_or_else(|p| p.into_inner());
        let n = g.len();
        g.clear();
        tracing::debug!(channels = n, "channel registry torn down");
    }
}
