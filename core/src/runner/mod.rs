mod io_pump;
mod traits;
pub mod types;

pub use io_pump::{pump_lines, LineStream, LineTap};
pub use traits::{CommandExecutor, InteractiveSession, SessionLauncher};
pub use types::{CommandOutput, CommandSpec, Signal};
