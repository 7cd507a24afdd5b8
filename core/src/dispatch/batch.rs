//! Fan-in bookkeeping for one dispatch across N channels.
//!
//! Slots are sized before any channel command is issued and each one is
//! written exactly once. The completion counter's post-increment value decides
//! which completion fires the aggregate callback.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::channel::KeyDatabaseInfo;

/// Spawn failure, broken pipe or timeout.
pub const EXIT_TRANSPORT: i32 = -1;
/// The command was still running when the dispatch was cancelled.
pub const EXIT_CANCELLED: i32 = -2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResult {
    pub channel: i32,
    pub name: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub operation: String,
    pub success: bool,
    pub cancelled: bool,
    /// In channel enumeration order, independent of completion order.
    pub results: Vec<ChannelResult>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl DispatchOutcome {
    /// 0 on success, -1 otherwise.
    pub fn code(&self) -> i32 {
        if self.success {
            0
        } else {
            -1
        }
    }

    pub(crate) fn failed(operation: &str, error: impl Into<String>) -> Self {
        Self {
            operation: operation.to_string(),
            success: false,
            cancelled: false,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }
}

pub(crate) type CompletionFn = Box<dyn FnOnce(DispatchOutcome) + Send + 'static>;

#[derive(Debug)]
struct Slot {
    exit_code: i32,
    stderr: String,
}

pub(crate) struct DispatchBatch {
    operation: String,
    channels: Vec<KeyDatabaseInfo>,
    slots: Vec<OnceLock<Slot>>,
    completed: AtomicUsize,
    on_complete: Mutex<Option<CompletionFn>>,
}

impl DispatchBatch {
    pub(crate) fn new(
        operation: impl Into<String>,
        channels: Vec<KeyDatabaseInfo>,
        on_complete: CompletionFn,
    ) -> Self {
        let slots = channels.iter().map(|_| OnceLock::new()).collect();
        Self {
            operation: operation.into(),
            channels,
            slots,
            completed: AtomicUsize::new(0),
            on_complete: Mutex::new(Some(on_complete)),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Records the result of channel slot `index`. The call that completes the
    /// last slot fires the aggregate callback.
    pub(crate) fn record(&self, index: usize, exit_code: i32, stderr: String, cancelled: bool) {
        let Some(slot) = self.slots.get(index) else {
            tracing::error!(index, slots = self.slots.len(), "dispatch slot out of range");
            return;
        };
        if slot.set(Slot { exit_code, stderr }).is_err() {
            tracing::error!(index, "dispatch slot written twice");
            return;
        }

        let done = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(
            operation = %self.operation,
            channel = self.channels[index].channel,
            exit_code,
            done,
            total = self.slots.len(),
            "channel finished"
        );
        if done == self.slots.len() {
            self.finish(cancelled);
        }
    }

    /// Fires the callback of an empty batch.
    pub(crate) fn finish_empty(&self) {
        if self.slots.is_empty() {
            self.finish(false);
        }
    }

    fn finish(&self, cancelled: bool) {
        let results: Vec<ChannelResult> = self
            .channels
            .iter()
            .zip(&self.slots)
            .map(|(info, slot)| {
                let (exit_code, stderr) = slot
                    .get()
                    .map(|s| (s.exit_code, s.stderr.clone()))
                    .unwrap_or((EXIT_TRANSPORT, String::new()));
                ChannelResult {
                    channel: info.channel,
                    name: info.name.clone(),
                    exit_code,
                    stderr,
                }
            })
            .collect();

        let success = results.iter().all(|r| r.exit_code >= 0);
        let outcome = DispatchOutcome {
            operation: self.operation.clone(),
            success,
            cancelled,
            results,
            error: None,
        };

        let cb = self
            .on_complete
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(cb) = cb {
            tracing::info!(
                operation = %outcome.operation,
                success = outcome.success,
                cancelled = outcome.cancelled,
                channels = outcome.results.len(),
                "dispatch finished"
            );
            cb(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn infos(n: i32) -> Vec<KeyDatabaseInfo> {
        (0..n)
            .map(|i| KeyDatabaseInfo::new(i, format!("db{i}"), format!("/g{i}")))
            .collect()
    }

    fn capture() -> (Arc<Mutex<Vec<DispatchOutcome>>>, CompletionFn) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, Box::new(move |o| sink.lock().unwrap().push(o)))
    }

    #[test]
    fn fires_once_after_last_slot_in_any_order() {
        let (seen, cb) = capture();
        let batch = DispatchBatch::new("op", infos(3), cb);

        batch.record(2, 7, String::new(), false);
        assert!(seen.lock().unwrap().is_empty());
        batch.record(0, 0, String::new(), false);
        assert!(seen.lock().unwrap().is_empty());
        batch.record(1, 1, "warn".into(), false);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let codes: Vec<i32> = seen[0].results.iter().map(|r| r.exit_code).collect();
        assert_eq!(codes, vec![0, 1, 7]);
        assert_eq!(seen[0].results[1].stderr, "warn");
        assert!(seen[0].success);
    }

    #[test]
    fn negative_code_fails_the_batch() {
        let (seen, cb) = capture();
        let batch = DispatchBatch::new("op", infos(3), cb);
        for (i, code) in [0, 0, EXIT_TRANSPORT].into_iter().enumerate() {
            batch.record(i, code, String::new(), false);
        }
        let seen = seen.lock().unwrap();
        assert!(!seen[0].success);
        assert_eq!(seen[0].code(), -1);
    }

    #[test]
    fn double_write_is_ignored() {
        let (seen, cb) = capture();
        let batch = DispatchBatch::new("op", infos(2), cb);
        batch.record(0, 0, String::new(), false);
        batch.record(0, 0, String::new(), false);
        assert!(seen.lock().unwrap().is_empty());
        batch.record(1, 0, String::new(), false);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn empty_batch_is_vacuously_successful() {
        let (seen, cb) = capture();
        let batch = DispatchBatch::new("op", Vec::new(), cb);
        assert_eq!(batch.len(), 0);
        batch.finish_empty();
        batch.finish_empty();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].success);
        assert!(seen[0].results.is_empty());
    }
}
