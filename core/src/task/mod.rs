//! Units of work with an origin: bodies run on a pinned thread or a worker
//! pool, completions are marshaled back to the [`TaskOwner`] that created them.

mod owner;
mod scheduler;
mod types;

pub use owner::TaskOwner;
pub use scheduler::TaskScheduler;
pub use types::{Task, TaskCallback, TaskData, TaskEvent, TaskRunnable, RC_PANICKED};
