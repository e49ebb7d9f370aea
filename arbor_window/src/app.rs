// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Application context.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arbor_dispatch::{DispatchError, Dispatcher, MergeKey, Priority};
use parking_lot::Mutex;

/// Identifier of a window within one [`AppContext`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    /// Raw value, also used as the window's render-pass merge key.
    pub fn get(self) -> u64 {
        self.0
    }
}

type Listener = Arc<dyn Fn() + Send + Sync>;

struct AppInner {
    dispatcher: Arc<Dispatcher>,
    windows: Mutex<Vec<WindowId>>,
    requery_listeners: Mutex<Vec<Listener>>,
    next_window: AtomicU64,
}

/// Process-wide state threaded explicitly through windows: the UI dispatcher, the set of
/// open windows, and command re-query fan-out.
///
/// Cloning is cheap and shares the same state.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppInner>,
}

impl core::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppContext")
            .field("dispatcher", &self.inner.dispatcher)
            .field("windows", &*self.inner.windows.lock())
            .finish_non_exhaustive()
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext {
    /// A context whose dispatcher is owned by the calling thread.
    pub fn new() -> Self {
        Self::with_dispatcher(Arc::new(Dispatcher::new()))
    }

    /// A context around an existing dispatcher.
    pub fn with_dispatcher(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            inner: Arc::new(AppInner {
                dispatcher,
                windows: Mutex::new(Vec::new()),
                requery_listeners: Mutex::new(Vec::new()),
                next_window: AtomicU64::new(1),
            }),
        }
    }

    /// The UI dispatcher.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }

    /// Drain the dispatcher. See [`Dispatcher::process`].
    pub fn process(&self) -> Result<usize, DispatchError> {
        self.inner.dispatcher.process()
    }

    /// Install the hook offered every failed dispatcher action.
    pub fn set_exception_handler(
        &self,
        handler: impl FnMut(&anyhow::Error) -> bool + Send + 'static,
    ) {
        self.inner.dispatcher.set_exception_handler(handler);
    }

    /// Windows currently shown or hidden (not closed), in the order they were first shown.
    pub fn windows(&self) -> Vec<WindowId> {
        self.inner.windows.lock().clone()
    }

    /// Register `listener` to run on every command re-query.
    pub fn on_command_requery(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.inner
            .requery_listeners
            .lock()
            .push(Arc::new(listener));
    }

    /// Schedule one re-evaluation of command-bound state.
    ///
    /// Requests made before the pending re-query runs are merged into it. Returns true if
    /// this call queued a new one.
    pub fn request_command_requery(&self) -> bool {
        let weak: Weak<AppInner> = Arc::downgrade(&self.inner);
        self.inner.dispatcher.enqueue_merged(
            Priority::Background,
            MergeKey::COMMAND_REQUERY,
            move || {
                let Some(inner) = weak.upgrade() else {
                    return Ok(());
                };
                let listeners = inner.requery_listeners.lock().clone();
                log::trace!("command re-query: {} listeners", listeners.len());
                for listener in listeners {
                    listener();
                }
                Ok(())
            },
        )
    }

    pub(crate) fn allocate_window_id(&self) -> WindowId {
        WindowId(self.inner.next_window.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn register_window(&self, id: WindowId) {
        let mut windows = self.inner.windows.lock();
        if !windows.contains(&id) {
            windows.push(id);
        }
    }

    pub(crate) fn unregister_window(&self, id: WindowId) {
        self.inner.windows.lock().retain(|&w| w != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn command_requery_is_coalesced() {
        let app = AppContext::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let r = runs.clone();
        app.on_command_requery(move || {
            r.fetch_add(1, Ordering::SeqCst);
        });
        assert!(app.request_command_requery());
        assert!(!app.request_command_requery());
        assert!(!app.request_command_requery());
        assert_eq!(app.process().unwrap(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(app.request_command_requery());
    }

    #[test]
    fn window_registry_tracks_ids() {
        let app = AppContext::new();
        let a = app.allocate_window_id();
        let b = app.allocate_window_id();
        assert_ne!(a, b);
        app.register_window(a);
        app.register_window(b);
        app.register_window(a);
        assert_eq!(app.windows(), [a, b]);
        app.unregister_window(a);
        assert_eq!(app.windows(), [b]);
    }
}
