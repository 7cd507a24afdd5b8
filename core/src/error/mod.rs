#[allow(clippy::module_inception)]
pub mod error;
pub mod task;

pub use error::{CliError, KeyEditError, RunnerError};
pub use task::TaskError;
