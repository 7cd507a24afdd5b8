//! Fan-out of one gpgconf command across all key databases, fan-in of the
//! per-channel exit codes into one aggregate outcome.

mod batch;
mod command;
mod dispatcher;

pub use batch::{ChannelResult, DispatchOutcome, EXIT_CANCELLED, EXIT_TRANSPORT};
pub use command::GpgconfCommand;
pub use dispatcher::{DispatchHandle, MultiChannelDispatcher};
