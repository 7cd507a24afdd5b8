mod command;
mod session;

pub use command::ProcessCommandExecutor;
pub use session::ProcessSessionLauncher;
