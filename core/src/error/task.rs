use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("scheduler is shut down")]
    SchedulerClosed,
    #[error("pinned worker dropped task {0}")]
    PinnedWorkerGone(String),
    #[error("task owner is gone, completion of {0} abandoned")]
    OwnerGone(String),
    #[error("failed to start worker thread: {0}")]
    Thread(#[from] std::io::Error),
}
