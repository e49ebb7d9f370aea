// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dispatcher queue.

use std::collections::{HashSet, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use log::{debug, error, trace, warn};
use parking_lot::Mutex;

use crate::operation::{DispatcherOperation, OperationStatus, Signal};
use crate::types::{DispatchError, DispatcherState, MergeKey, Priority};

/// Boxed unit of work.
pub type Action = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

type ExceptionHandler = Box<dyn FnMut(&anyhow::Error) -> bool + Send>;
type Hook = Arc<dyn Fn() + Send + Sync>;

struct Item {
    action: Action,
    merge_key: Option<MergeKey>,
    signal: Option<Arc<Signal>>,
    operation: Option<DispatcherOperation>,
}

impl Item {
    fn new(action: Action) -> Self {
        Self {
            action,
            merge_key: None,
            signal: None,
            operation: None,
        }
    }

    fn discard(self) {
        if let Some(op) = &self.operation {
            op.abort();
        }
        if let Some(signal) = &self.signal {
            signal.set();
        }
    }
}

#[derive(Default)]
struct Queues {
    lanes: [VecDeque<Item>; Priority::COUNT],
    merge_keys: HashSet<MergeKey>,
    /// Set by `shutdown` under this lock; nothing is queued afterwards.
    closed: bool,
}

impl Queues {
    fn pop_highest(&mut self) -> Option<Item> {
        self.lanes.iter_mut().find_map(VecDeque::pop_front)
    }

    fn len(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }
}

struct RunState {
    state: DispatcherState,
    fatal: Option<anyhow::Error>,
}

/// Releases an item's merge key, marks its operation complete, and sets its signal,
/// however the action ended.
struct Completion<'a> {
    queues: &'a Mutex<Queues>,
    merge_key: Option<MergeKey>,
    signal: Option<Arc<Signal>>,
    operation: Option<DispatcherOperation>,
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.merge_key.take() {
            self.queues.lock().merge_keys.remove(&key);
        }
        if let Some(op) = &self.operation {
            op.complete();
        }
        if let Some(signal) = &self.signal {
            signal.set();
        }
    }
}

/// Thread-safe, priority-ordered work queue drained on the thread that created it.
///
/// Any thread may enqueue. [`process`](Self::process) must be called on the owning (UI)
/// thread. If an action fails and no exception handler accepts the error, the dispatcher
/// moves to [`DispatcherState::ShuttingDown`] and runs nothing further.
pub struct Dispatcher {
    queues: Mutex<Queues>,
    run: Mutex<RunState>,
    exception_handler: Mutex<Option<ExceptionHandler>>,
    shutdown_hook: Mutex<Option<Hook>>,
    wakeup: Mutex<Option<Hook>>,
    owner: ThreadId,
}

impl core::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &self.state())
            .field("pending", &self.pending_len())
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// A running dispatcher owned by the calling thread.
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(Queues::default()),
            run: Mutex::new(RunState {
                state: DispatcherState::Running,
                fatal: None,
            }),
            exception_handler: Mutex::new(None),
            shutdown_hook: Mutex::new(None),
            wakeup: Mutex::new(None),
            owner: thread::current().id(),
        }
    }

    /// Returns true if the caller is on the dispatcher's owning thread.
    pub fn check_access(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Current run state.
    pub fn state(&self) -> DispatcherState {
        self.run.lock().state
    }

    /// Take the error that triggered shutdown, if any.
    pub fn take_fatal_error(&self) -> Option<anyhow::Error> {
        self.run.lock().fatal.take()
    }

    /// Returns true if any action is queued.
    pub fn has_pending(&self) -> bool {
        self.pending_len() > 0
    }

    /// Number of queued actions across all priorities.
    pub fn pending_len(&self) -> usize {
        self.queues.lock().len()
    }

    /// Install the handler consulted when an action fails.
    ///
    /// Returning true marks the error handled and processing continues.
    pub fn set_exception_handler(
        &self,
        handler: impl FnMut(&anyhow::Error) -> bool + Send + 'static,
    ) {
        *self.exception_handler.lock() = Some(Box::new(handler));
    }

    /// Install the hook called once when an unhandled failure requests shutdown.
    pub fn set_shutdown_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.shutdown_hook.lock() = Some(Arc::new(hook));
    }

    /// Install the hook called after every successful enqueue, typically to wake the
    /// platform message loop.
    pub fn set_wakeup(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.wakeup.lock() = Some(Arc::new(hook));
    }

    /// Queue `action` at `priority`.
    pub fn enqueue(
        &self,
        priority: Priority,
        action: impl FnOnce() -> anyhow::Result<()> + Send + 'static,
    ) {
        self.push(priority, Item::new(Box::new(action)));
    }

    /// Queue `action` and return a handle that can observe or abort it.
    ///
    /// If the dispatcher is not running the handle is already aborted.
    pub fn enqueue_with_operation(
        &self,
        priority: Priority,
        action: impl FnOnce() -> anyhow::Result<()> + Send + 'static,
    ) -> DispatcherOperation {
        let op = DispatcherOperation::new(priority);
        let mut item = Item::new(Box::new(action));
        item.operation = Some(op.clone());
        self.push(priority, item);
        op
    }

    /// Queue `action` unless an action with the same key is already pending.
    ///
    /// Returns true if this call queued it.
    pub fn enqueue_merged(
        &self,
        priority: Priority,
        key: MergeKey,
        action: impl FnOnce() -> anyhow::Result<()> + Send + 'static,
    ) -> bool {
        let mut item = Item::new(Box::new(action));
        item.merge_key = Some(key);
        self.push(priority, item)
    }

    /// Queue `action` and set `signal` once it has run, failed, or been discarded.
    pub fn enqueue_with_signal(
        &self,
        priority: Priority,
        signal: Arc<Signal>,
        action: impl FnOnce() -> anyhow::Result<()> + Send + 'static,
    ) {
        let mut item = Item::new(Box::new(action));
        item.signal = Some(signal);
        self.push(priority, item);
    }

    /// Run `action` on the owning thread and wait for it.
    ///
    /// On the owning thread the action runs inline and its error is returned. From any
    /// other thread it is queued at `priority` and the caller blocks until it has been
    /// processed; a failure there goes through the exception handler like any queued
    /// action. Returns [`DispatchError::NotRunning`] if the action was discarded.
    pub fn invoke(
        &self,
        priority: Priority,
        action: impl FnOnce() -> anyhow::Result<()> + Send + 'static,
    ) -> Result<(), DispatchError> {
        if self.state() != DispatcherState::Running {
            return Err(DispatchError::NotRunning);
        }
        if self.check_access() {
            return run_caught(Box::new(action)).map_err(DispatchError::Action);
        }
        let signal = Signal::new();
        let op = DispatcherOperation::new(priority);
        let mut item = Item::new(Box::new(action));
        item.signal = Some(signal.clone());
        item.operation = Some(op.clone());
        self.push(priority, item);
        signal.wait();
        match op.status() {
            OperationStatus::Completed => Ok(()),
            _ => Err(DispatchError::NotRunning),
        }
    }

    fn push(&self, priority: Priority, item: Item) -> bool {
        if self.state() != DispatcherState::Running {
            debug!("dispatcher not running; discarding {priority:?} action");
            item.discard();
            return false;
        }
        {
            let mut queues = self.queues.lock();
            if queues.closed {
                drop(queues);
                debug!("dispatcher stopped while queuing; discarding {priority:?} action");
                item.discard();
                return false;
            }
            if let Some(key) = item.merge_key
                && !queues.merge_keys.insert(key)
            {
                trace!("merged {priority:?} action into pending {key:?}");
                return false;
            }
            queues.lanes[priority.lane()].push_back(item);
        }
        let wakeup = self.wakeup.lock().clone();
        if let Some(wakeup) = wakeup {
            wakeup();
        }
        true
    }

    /// Drain the queue, highest priority first, until it is empty.
    ///
    /// Actions queued while draining are picked up in the same call, so a newly queued
    /// higher-priority action runs before older lower-priority ones. Returns the number of
    /// actions executed.
    pub fn process(&self) -> Result<usize, DispatchError> {
        debug_assert!(self.check_access(), "process called off the owning thread");
        if self.state() != DispatcherState::Running {
            return Err(DispatchError::NotRunning);
        }
        let mut executed = 0;
        loop {
            let Some(item) = self.queues.lock().pop_highest() else {
                break;
            };
            let Item {
                action,
                merge_key,
                signal,
                operation,
            } = item;
            let completion = Completion {
                queues: &self.queues,
                merge_key,
                signal,
                operation,
            };
            if let Some(op) = &completion.operation
                && !op.begin()
            {
                trace!("skipping aborted operation");
                continue;
            }
            let result = run_caught(action);
            drop(completion);
            executed += 1;
            if let Err(err) = result {
                if self.offer_to_handler(&err) {
                    debug!("action error handled: {err:#}");
                    continue;
                }
                error!("unhandled action error, shutting down: {err:#}");
                self.request_shutdown(err);
                return Err(DispatchError::ShutdownRequested);
            }
        }
        Ok(executed)
    }

    fn offer_to_handler(&self, err: &anyhow::Error) -> bool {
        // Taken out while it runs so the handler may call back into the dispatcher.
        let Some(mut handler) = self.exception_handler.lock().take() else {
            return false;
        };
        let handled = handler(err);
        let mut slot = self.exception_handler.lock();
        if slot.is_none() {
            *slot = Some(handler);
        }
        handled
    }

    fn request_shutdown(&self, err: anyhow::Error) {
        {
            let mut run = self.run.lock();
            run.state = DispatcherState::ShuttingDown;
            run.fatal = Some(err);
        }
        let hook = self.shutdown_hook.lock().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Stop the dispatcher and discard all pending work.
    ///
    /// Discarded operations become aborted and their signals are set, releasing any
    /// thread blocked in [`invoke`](Self::invoke). Returns the number of discarded actions.
    pub fn shutdown(&self) -> usize {
        self.run.lock().state = DispatcherState::Stopped;
        let drained: Vec<Item> = {
            let mut queues = self.queues.lock();
            queues.closed = true;
            queues.merge_keys.clear();
            queues.lanes.iter_mut().flat_map(|lane| lane.drain(..)).collect()
        };
        let count = drained.len();
        if count > 0 {
            warn!("dispatcher stopped with {count} pending actions");
        }
        for item in drained {
            item.discard();
        }
        count
    }
}

fn run_caught(action: Action) -> anyhow::Result<()> {
    catch_unwind(AssertUnwindSafe(action)).unwrap_or_else(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Err(anyhow::anyhow!("action panicked: {msg}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use core::time::Duration;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Action) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        let make = move |name: &'static str| -> Action {
            let l = l.clone();
            Box::new(move || {
                l.lock().push(name);
                Ok(())
            })
        };
        (log, make)
    }

    #[test]
    fn drains_by_priority_then_fifo() {
        let d = Dispatcher::new();
        let (log, make) = recorder();
        d.enqueue(Priority::Idle, make("idle"));
        d.enqueue(Priority::Normal, make("n1"));
        d.enqueue(Priority::Render, make("render"));
        d.enqueue(Priority::Normal, make("n2"));
        d.enqueue(Priority::Input, make("input"));
        assert_eq!(d.pending_len(), 5);
        assert_eq!(d.process().unwrap(), 5);
        assert_eq!(*log.lock(), ["input", "n1", "n2", "render", "idle"]);
        assert!(!d.has_pending());
    }

    #[test]
    fn higher_priority_queued_mid_drain_runs_next() {
        let d = Arc::new(Dispatcher::new());
        let (log, make) = recorder();
        let inner = d.clone();
        let urgent = make("urgent");
        let l = log.clone();
        d.enqueue(Priority::Normal, move || {
            l.lock().push("first");
            inner.enqueue(Priority::Send, urgent);
            Ok(())
        });
        d.enqueue(Priority::Normal, make("second"));
        d.process().unwrap();
        assert_eq!(*log.lock(), ["first", "urgent", "second"]);
    }

    #[test]
    fn merged_enqueue_is_idempotent_until_run() {
        let d = Dispatcher::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let key = MergeKey::render_pass(1);
        let mut accepted = 0;
        for _ in 0..5 {
            let runs = runs.clone();
            if d.enqueue_merged(Priority::Render, key, move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }) {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(d.pending_len(), 1);
        d.process().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // The key is free again once the action ran.
        assert!(d.enqueue_merged(Priority::Render, key, || Ok(())));
        assert!(d.enqueue_merged(Priority::Render, MergeKey::render_pass(2), || Ok(())));
    }

    #[test]
    fn merge_key_released_even_when_action_fails() {
        let d = Dispatcher::new();
        d.set_exception_handler(|_| true);
        let key = MergeKey::COMMAND_REQUERY;
        assert!(d.enqueue_merged(Priority::Background, key, || anyhow::bail!("boom")));
        d.process().unwrap();
        assert!(d.enqueue_merged(Priority::Background, key, || Ok(())));
    }

    #[test]
    fn aborted_operation_never_runs_but_signals() {
        let d = Dispatcher::new();
        let (log, make) = recorder();
        let op = d.enqueue_with_operation(Priority::Normal, make("aborted"));
        let signal = Signal::new();
        d.enqueue_with_signal(Priority::Normal, signal.clone(), make("kept"));
        assert!(op.abort());
        assert_eq!(d.process().unwrap(), 1);
        assert_eq!(*log.lock(), ["kept"]);
        assert_eq!(op.status(), OperationStatus::Aborted);
        assert!(signal.is_set());
    }

    #[test]
    fn operation_completes_after_run() {
        let d = Dispatcher::new();
        let op = d.enqueue_with_operation(Priority::Layout, || Ok(()));
        assert_eq!(op.status(), OperationStatus::Pending);
        d.process().unwrap();
        assert_eq!(op.status(), OperationStatus::Completed);
        assert!(!op.abort());
    }

    #[test]
    fn handled_error_keeps_processing() {
        let d = Dispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        d.set_exception_handler(move |e| {
            s.lock().push(e.to_string());
            true
        });
        let (log, make) = recorder();
        let signal = Signal::new();
        d.enqueue_with_signal(Priority::Normal, signal.clone(), || anyhow::bail!("bad"));
        d.enqueue(Priority::Normal, make("after"));
        assert_eq!(d.process().unwrap(), 2);
        assert_eq!(*seen.lock(), ["bad"]);
        assert_eq!(*log.lock(), ["after"]);
        assert!(signal.is_set());
        assert_eq!(d.state(), DispatcherState::Running);
    }

    #[test]
    fn unhandled_error_requests_shutdown_and_stops() {
        let d = Dispatcher::new();
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let h = hook_calls.clone();
        d.set_shutdown_hook(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        let (log, make) = recorder();
        d.enqueue(Priority::Input, || anyhow::bail!("fatal"));
        d.enqueue(Priority::Normal, make("never"));

        assert!(matches!(d.process(), Err(DispatchError::ShutdownRequested)));
        assert_eq!(d.state(), DispatcherState::ShuttingDown);
        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
        assert!(log.lock().is_empty());
        assert_eq!(d.take_fatal_error().unwrap().to_string(), "fatal");
        assert!(d.take_fatal_error().is_none());

        // No further processing or queuing.
        assert!(matches!(d.process(), Err(DispatchError::NotRunning)));
        assert!(!d.enqueue_merged(Priority::Normal, MergeKey::new("x", 0), || Ok(())));
    }

    #[test]
    fn declining_handler_is_still_fatal() {
        let d = Dispatcher::new();
        d.set_exception_handler(|_| false);
        d.enqueue(Priority::Normal, || anyhow::bail!("declined"));
        assert!(matches!(d.process(), Err(DispatchError::ShutdownRequested)));
    }

    #[test]
    fn panics_become_errors() {
        let d = Dispatcher::new();
        let seen = Arc::new(Mutex::new(String::new()));
        let s = seen.clone();
        d.set_exception_handler(move |e| {
            *s.lock() = e.to_string();
            true
        });
        d.enqueue(Priority::Normal, || panic!("kaboom"));
        assert_eq!(d.process().unwrap(), 1);
        assert_eq!(*seen.lock(), "action panicked: kaboom");
    }

    #[test]
    fn inline_invoke_returns_action_error() {
        let d = Dispatcher::new();
        assert!(d.invoke(Priority::Send, || Ok(())).is_ok());
        let err = d.invoke(Priority::Send, || anyhow::bail!("nope")).unwrap_err();
        assert!(matches!(err, DispatchError::Action(_)));
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn cross_thread_invoke_waits_for_processing() {
        let d = Arc::new(Dispatcher::new());
        let ran = Arc::new(AtomicUsize::new(0));
        let worker = {
            let d = d.clone();
            let ran = ran.clone();
            thread::spawn(move || {
                assert!(!d.check_access());
                d.invoke(Priority::Send, move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
        };
        while !worker.is_finished() {
            d.process().unwrap();
            thread::sleep(Duration::from_millis(1));
        }
        assert!(worker.join().unwrap().is_ok());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shutdown_discards_and_releases_waiters() {
        let d = Arc::new(Dispatcher::new());
        let op = d.enqueue_with_operation(Priority::Idle, || Ok(()));
        let signal = Signal::new();
        d.enqueue_with_signal(Priority::Normal, signal.clone(), || Ok(()));
        let waiter = {
            let d = d.clone();
            thread::spawn(move || d.invoke(Priority::Send, || Ok(())))
        };
        while d.pending_len() < 3 {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(d.shutdown(), 3);
        assert!(matches!(
            waiter.join().unwrap(),
            Err(DispatchError::NotRunning)
        ));
        assert_eq!(op.status(), OperationStatus::Aborted);
        assert!(signal.is_set());
        assert_eq!(d.state(), DispatcherState::Stopped);

        let late = Signal::new();
        d.enqueue_with_signal(Priority::Normal, late.clone(), || Ok(()));
        assert!(late.is_set());
        assert!(!d.has_pending());
    }

    #[test]
    fn enqueue_that_saw_running_is_discarded_after_shutdown() {
        let d = Dispatcher::new();
        assert_eq!(d.shutdown(), 0);
        // An enqueue that read the state just before shutdown took the queue lock.
        d.run.lock().state = DispatcherState::Running;
        let signal = Signal::new();
        d.enqueue_with_signal(Priority::Normal, signal.clone(), || Ok(()));
        let op = d.enqueue_with_operation(Priority::Normal, || Ok(()));
        let key = MergeKey::new("late", 1);
        assert!(!d.enqueue_merged(Priority::Normal, key, || Ok(())));
        assert!(signal.is_set());
        assert_eq!(op.status(), OperationStatus::Aborted);
        assert!(!d.has_pending());
        assert!(!d.queues.lock().merge_keys.contains(&key));
    }

    #[test]
    fn concurrent_enqueue_and_shutdown_release_every_signal() {
        for _ in 0..50 {
            let d = Arc::new(Dispatcher::new());
            let workers: Vec<_> = (0..4)
                .map(|_| {
                    let d = d.clone();
                    thread::spawn(move || {
                        (0..200)
                            .map(|_| {
                                let signal = Signal::new();
                                let queued = signal.clone();
                                d.enqueue_with_signal(Priority::Normal, queued, || Ok(()));
                                signal
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            d.shutdown();
            for worker in workers {
                for signal in worker.join().unwrap() {
                    assert!(signal.wait_timeout(Duration::from_secs(5)));
                }
            }
            assert!(!d.has_pending());
        }
    }

    #[test]
    fn wakeup_fires_on_accepted_enqueue_only() {
        let d = Dispatcher::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let w = wakes.clone();
        d.set_wakeup(move || {
            w.fetch_add(1, Ordering::SeqCst);
        });
        let key = MergeKey::new("k", 7);
        d.enqueue_merged(Priority::Normal, key, || Ok(()));
        d.enqueue_merged(Priority::Normal, key, || Ok(()));
        d.enqueue(Priority::Idle, || Ok(()));
        assert_eq!(wakes.load(Ordering::SeqCst), 2);
    }
}
