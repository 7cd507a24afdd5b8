//! Key-database channels: descriptors, enumeration and the per-channel context registry.

mod registry;
mod source;
mod types;

pub use registry::{ChannelContext, ContextManager};
pub use source::{ChannelSource, ConfigChannelSource, StaticChannelSource};
pub use types::KeyDatabaseInfo;
