use std::path::PathBuf;

use crate::config::KeyDatabaseConfig;

use super::types::KeyDatabaseInfo;

/// Enumerates the configured key databases. Callers query it fresh on every
/// operation; implementations must not assume results are cached.
pub trait ChannelSource: Send + Sync {
    fn key_databases(&self) -> Vec<KeyDatabaseInfo>;
}

/// Channels from the `[[key_databases]]` config section; channel id is the
/// position in the list.
pub struct ConfigChannelSource {
    databases: Vec<KeyDatabaseConfig>,
}

impl ConfigChannelSource {
    pub fn new(databases: Vec<KeyDatabaseConfig>) -> Self {
        Self { databases }
    }
}

impl ChannelSource for ConfigChannelSource {
    fn key_databases(&self) -> Vec<KeyDatabaseInfo> {
        self.databases
            .iter()
            .enumerate()
            .map(|(i, db)| KeyDatabaseInfo::new(i as i32, db.name.clone(), PathBuf::from(&db.path)))
            .collect()
    }
}

/// Fixed list, mostly useful for tests and embedding.
pub struct StaticChannelSource(pub Vec<KeyDatabaseInfo>);

impl ChannelSource for StaticChannelSource {
    fn key_databases(&self) -> Vec<KeyDatabaseInfo> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_source_assigns_channels_by_position() {
        let src = ConfigChannelSource::new(vec![
            KeyDatabaseConfig {
                name: "a".into(),
                path: "/a".into(),
            },
            KeyDatabaseConfig {
                name: "b".into(),
                path: "/b".into(),
            },
        ]);
        let dbs = src.key_databases();
        assert_eq!(dbs.len(), 2);
        assert_eq!(dbs[1], KeyDatabaseInfo::new(1, "b", "/b"));
    }
}
