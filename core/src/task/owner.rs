use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::{broadcast, mpsc};

use super::types::{Completion, Task, TaskData, TaskEvent};

const EVENT_CAPACITY: usize = 256;

/// The origin side of a set of tasks. Completions are queued here and their
/// callbacks run on whatever thread polls the owner.
pub struct TaskOwner {
    name: String,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    events: broadcast::Sender<TaskEvent>,
}

impl TaskOwner {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            name: name.into(),
            tx,
            rx,
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a task whose completion is marshaled back to this owner.
    pub fn task<F>(&self, name: impl Into<String>, runnable: F) -> Task
    where
        F: FnOnce(&mut TaskData) -> i32 + Send + 'static,
    {
        Task::new(name, Box::new(runnable), self.tx.clone(), self.events.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    /// Waits for the next completion, runs its callback and announces
    /// [`TaskEvent::Ended`]. Returns that event.
    pub async fn next(&mut self) -> Option<TaskEvent> {
        let completion = self.rx.recv().await?;
        Some(self.complete(completion))
    }

    /// Handles every completion already queued without waiting.
    pub fn process_pending(&mut self) -> Vec<TaskEvent> {
        let mut out = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            out.push(self.complete(completion));
        }
        out
    }

    fn complete(&self, completion: Completion) -> TaskEvent {
        let Completion {
            id,
            rc,
            data,
            callback,
        } = completion;

        if let Some(cb) = callback {
            if catch_unwind(AssertUnwindSafe(|| cb(rc, data))).is_err() {
                tracing::error!(owner = %self.name, task = %id, rc, "task callback panicked");
            }
        }

        tracing::debug!(owner = %self.name, task = %id, rc, "task ended");
        let ended = TaskEvent::Ended { id, rc };
        let _ = self.events.send(ended.clone());
        ended
    }
}
