// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Operation handles and completion signals.

use core::sync::atomic::{AtomicU8, Ordering};
use core::time::Duration;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::types::Priority;

/// Lifecycle of a queued action.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum OperationStatus {
    /// Queued, not yet dequeued.
    Pending = 0,
    /// Dequeued and running.
    Executing = 1,
    /// Ran to completion (successfully or not).
    Completed = 2,
    /// Aborted before it was dequeued; it will never run.
    Aborted = 3,
}

impl OperationStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Pending,
            1 => Self::Executing,
            2 => Self::Completed,
            _ => Self::Aborted,
        }
    }
}

/// Handle to an action queued with
/// [`Dispatcher::enqueue_with_operation`](crate::Dispatcher::enqueue_with_operation).
///
/// Cloning shares the same status.
#[derive(Clone, Debug)]
pub struct DispatcherOperation {
    status: Arc<AtomicU8>,
    priority: Priority,
}

impl DispatcherOperation {
    pub(crate) fn new(priority: Priority) -> Self {
        Self {
            status: Arc::new(AtomicU8::new(OperationStatus::Pending as u8)),
            priority,
        }
    }

    /// Current status.
    pub fn status(&self) -> OperationStatus {
        OperationStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Priority the action was queued at.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Abort the operation if it has not been dequeued yet.
    ///
    /// Returns true if this call moved it from pending to aborted. A running or finished
    /// operation cannot be aborted.
    pub fn abort(&self) -> bool {
        self.transition(OperationStatus::Pending, OperationStatus::Aborted)
    }

    pub(crate) fn begin(&self) -> bool {
        self.transition(OperationStatus::Pending, OperationStatus::Executing)
    }

    pub(crate) fn complete(&self) {
        self.transition(OperationStatus::Executing, OperationStatus::Completed);
    }

    fn transition(&self, from: OperationStatus, to: OperationStatus) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// One-shot completion flag another thread can block on.
///
/// The dispatcher always sets a signal attached to an action, whether the action ran,
/// failed, was skipped, or was discarded.
#[derive(Debug, Default)]
pub struct Signal {
    set: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    /// A fresh, unset signal ready to share.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Set the signal and wake every waiter.
    pub fn set(&self) {
        let mut set = self.set.lock();
        *set = true;
        self.cond.notify_all();
    }

    /// Returns true once the signal has been set.
    pub fn is_set(&self) -> bool {
        *self.set.lock()
    }

    /// Block until the signal is set.
    pub fn wait(&self) {
        let mut set = self.set.lock();
        while !*set {
            self.cond.wait(&mut set);
        }
    }

    /// Block until the signal is set or `timeout` elapses. Returns true if it was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut set = self.set.lock();
        if !*set {
            let _ = self.cond.wait_while_for(&mut set, |set| !*set, timeout);
        }
        *set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_only_from_pending() {
        let op = DispatcherOperation::new(Priority::Normal);
        assert_eq!(op.status(), OperationStatus::Pending);
        assert!(op.begin());
        assert!(!op.abort());
        op.complete();
        assert_eq!(op.status(), OperationStatus::Completed);

        let op = DispatcherOperation::new(Priority::Idle);
        assert!(op.abort());
        assert!(!op.abort());
        assert!(!op.begin());
        assert_eq!(op.status(), OperationStatus::Aborted);
        assert_eq!(op.priority(), Priority::Idle);
    }

    #[test]
    fn signal_wakes_waiter_on_other_thread() {
        let signal = Signal::new();
        let waiter = {
            let signal = signal.clone();
            std::thread::spawn(move || {
                signal.wait();
                signal.is_set()
            })
        };
        signal.set();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn wait_timeout_reports_unset() {
        let signal = Signal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(5)));
        signal.set();
        assert!(signal.wait_timeout(Duration::from_millis(5)));
    }
}
