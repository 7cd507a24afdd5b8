use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::config::TaskConfig;
use crate::error::TaskError;

use super::types::Task;

struct PinnedJob {
    task: Task,
    done: std_mpsc::SyncSender<Result<(), TaskError>>,
}

/// Runs task bodies either on one dedicated pinned thread or on a bounded
/// blocking pool.
pub struct TaskScheduler {
    pinned_tx: Option<mpsc::UnboundedSender<PinnedJob>>,
    pinned_id: ThreadId,
    pinned_join: Option<JoinHandle<()>>,
    pool: Option<Runtime>,
    workers: usize,
}

impl TaskScheduler {
    pub fn new(cfg: &TaskConfig) -> Result<Self, TaskError> {
        let workers = cfg
            .worker_threads
            .filter(|n| *n > 0)
            .unwrap_or_else(num_cpus::get);

        let pool = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("gpgdrive-worker")
            .enable_all()
            .build()?;

        let (pinned_tx, mut pinned_rx) = mpsc::unbounded_channel::<PinnedJob>();
        let pinned_join = thread::Builder::new()
            .name("gpgdrive-pinned".to_string())
            .spawn(move || {
                while let Some(job) = pinned_rx.blocking_recv() {
                    let _ = job.done.send(job.task.execute());
                }
                tracing::debug!("pinned worker stopped");
            })?;
        let pinned_id = pinned_join.thread().id();

        tracing::debug!(workers, "task scheduler started");
        Ok(Self {
            pinned_tx: Some(pinned_tx),
            pinned_id,
            pinned_join: Some(pinned_join),
            pool: Some(pool),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Pinned tasks run on the pinned thread and block the caller until the
    /// body has finished (inline when called from that thread). Other tasks
    /// go to the pool and the call returns at once.
    ///
    /// On error the task is abandoned and its callback never fires.
    pub fn submit(&self, mut task: Task, pinned: bool) -> Result<(), TaskError> {
        task.set_pinned(pinned);

        if !pinned {
            let Some(pool) = self.pool.as_ref() else {
                tracing::error!(task = %task.id(), "scheduler is shut down");
                return Err(TaskError::SchedulerClosed);
            };
            pool.spawn_blocking(move || {
                if let Err(e) = task.execute() {
                    tracing::error!(error = %e, "pool task completion failed");
                }
            });
            return Ok(());
        }

        if thread::current().id() == self.pinned_id {
            return task.execute();
        }

        let Some(tx) = self.pinned_tx.as_ref() else {
            tracing::error!(task = %task.id(), "scheduler is shut down");
            return Err(TaskError::SchedulerClosed);
        };
        let id = task.id();
        let (done_tx, done_rx) = std_mpsc::sync_channel(1);
        if tx.send(PinnedJob { task, done: done_tx }).is_err() {
            tracing::error!(task = %id, "pinned worker is gone, task abandoned");
            return Err(TaskError::PinnedWorkerGone(id));
        }
        match done_rx.recv() {
            Ok(res) => res,
            Err(_) => {
                tracing::error!(task = %id, "pinned worker dropped the task");
                Err(TaskError::PinnedWorkerGone(id))
            }
        }
    }

    /// Stops accepting work and waits for the pinned thread to drain.
    pub fn shutdown(mut self) {
        self.stop(true);
    }

    fn stop(&mut self, join: bool) {
        self.pinned_tx.take();
        if let Some(pool) = self.pool.take() {
            pool.shutdown_background();
        }
        if let Some(handle) = self.pinned_join.take() {
            if join && handle.join().is_err() {
                tracing::error!("pinned worker panicked");
            }
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.stop(false);
    }
}
