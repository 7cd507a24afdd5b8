mod load;
mod runtime;
mod types;

pub use load::{
    default_gnupg_home, get_gpgdrive_data_dir, load_default, load_from_path, load_from_str,
};
pub use runtime::{RuntimeValues, CORE_NAMESPACE, GPGCONF_PATH_KEY, GPG_PATH_KEY};
pub use types::{
    AppConfig, DispatchConfig, EngineConfig, KeyDatabaseConfig, LoggingConfig, TaskConfig,
};
