use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::error::TaskError;

/// Payload handed from a task body to its callback.
pub type TaskData = serde_json::Value;
pub type TaskRunnable = Box<dyn FnOnce(&mut TaskData) -> i32 + Send + 'static>;
pub type TaskCallback = Box<dyn FnOnce(i32, TaskData) + Send + 'static>;

/// Return code of a body that panicked.
pub const RC_PANICKED: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    Started { id: String, pinned: bool },
    Finished { id: String, rc: i32 },
    /// The callback (if any) has returned.
    Ended { id: String, rc: i32 },
}

impl TaskEvent {
    pub fn id(&self) -> &str {
        match self {
            TaskEvent::Started { id, .. }
            | TaskEvent::Finished { id, .. }
            | TaskEvent::Ended { id, .. } => id,
        }
    }
}

pub(crate) struct Completion {
    pub(crate) id: String,
    pub(crate) rc: i32,
    pub(crate) data: TaskData,
    pub(crate) callback: Option<TaskCallback>,
}

/// A unit of work created by a [`TaskOwner`](super::TaskOwner), whose
/// callback always runs where that owner is polled.
pub struct Task {
    uuid: Uuid,
    name: String,
    pinned: bool,
    data: TaskData,
    runnable: TaskRunnable,
    callback: Option<TaskCallback>,
    owner_tx: mpsc::UnboundedSender<Completion>,
    events: broadcast::Sender<TaskEvent>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("pinned", &self.pinned)
            .finish_non_exhaustive()
    }
}

impl Task {
    pub(crate) fn new(
        name: impl Into<String>,
        runnable: TaskRunnable,
        owner_tx: mpsc::UnboundedSender<Completion>,
        events: broadcast::Sender<TaskEvent>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            pinned: false,
            data: TaskData::Null,
            runnable,
            callback: None,
            owner_tx,
            events,
        }
    }

    pub fn with_data(mut self, data: TaskData) -> Self {
        self.data = data;
        self
    }

    pub fn with_callback(mut self, callback: impl FnOnce(i32, TaskData) + Send + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// `<uuid>/<name>`
    pub fn id(&self) -> String {
        format!("{}/{}", self.uuid, self.name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub(crate) fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }

    /// Runs the body on the current thread and marshals the completion to the
    /// owner. A panicking body yields [`RC_PANICKED`].
    pub(crate) fn execute(self) -> Result<(), TaskError> {
        let id = self.id();
        let Task {
            pinned,
            mut data,
            runnable,
            callback,
            owner_tx,
            events,
            ..
        } = self;

        let _ = events.send(TaskEvent::Started {
            id: id.clone(),
            pinned,
        });
        tracing::debug!(task = %id, pinned, "task started");

        let rc = match catch_unwind(AssertUnwindSafe(|| runnable(&mut data))) {
            Ok(rc) => rc,
            Err(_) => {
                tracing::error!(task = %id, "task body panicked");
                RC_PANICKED
            }
        };
        let _ = events.send(TaskEvent::Finished { id: id.clone(), rc });

        let completion = Completion {
            id: id.clone(),
            rc,
            data,
            callback,
        };
        if owner_tx.send(completion).is_err() {
            tracing::error!(task = %id, rc, "task owner is gone, completion abandoned");
            return Err(TaskError::OwnerGone(id));
        }
        Ok(())
    }
}
