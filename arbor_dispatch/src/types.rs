// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priorities, coalescing keys, run state, and errors.

/// Queue priority. Variants are declared highest first.
///
/// [`Dispatcher::process`](crate::Dispatcher::process) drains every higher priority
/// before touching a lower one; within a priority, items run in FIFO order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Priority {
    /// Synchronous cross-thread invocations.
    Send,
    /// Platform input delivery.
    Input,
    /// Default for application work.
    Normal,
    /// Measure/arrange passes.
    Layout,
    /// Repaint requests.
    Render,
    /// Deferred bookkeeping such as command re-query.
    Background,
    /// Work that only runs when nothing else is queued.
    Idle,
}

impl Priority {
    /// Number of priorities.
    pub const COUNT: usize = 7;

    /// All priorities, highest first.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Send,
        Self::Input,
        Self::Normal,
        Self::Layout,
        Self::Render,
        Self::Background,
        Self::Idle,
    ];

    pub(crate) const fn lane(self) -> usize {
        self as usize
    }
}

/// Identity used to coalesce equivalent pending actions.
///
/// At most one action per key can be queued at a time. The key is released once that
/// action has run, been skipped, or been discarded by shutdown.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MergeKey {
    kind: &'static str,
    id: u64,
}

impl MergeKey {
    /// Key for `id` within the `kind` namespace.
    pub const fn new(kind: &'static str, id: u64) -> Self {
        Self { kind, id }
    }

    /// The layout-and-render pass of one window.
    pub const fn render_pass(window: u64) -> Self {
        Self::new("render-pass", window)
    }

    /// The application-wide command re-query.
    pub const COMMAND_REQUERY: Self = Self::new("command-requery", 0);

    /// Namespace of the key.
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Identifier within the namespace.
    pub const fn id(&self) -> u64 {
        self.id
    }
}

/// Run state of a dispatcher.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DispatcherState {
    /// Accepting and executing work.
    Running,
    /// An action failed and no handler accepted the error. Nothing else runs.
    ShuttingDown,
    /// [`Dispatcher::shutdown`](crate::Dispatcher::shutdown) discarded all pending work.
    Stopped,
}

/// Errors surfaced by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// An action failed, no exception handler accepted it, and shutdown was requested.
    ///
    /// The error itself is available from
    /// [`Dispatcher::take_fatal_error`](crate::Dispatcher::take_fatal_error).
    #[error("an unhandled action error requested shutdown")]
    ShutdownRequested,
    /// The dispatcher is shutting down or stopped.
    #[error("the dispatcher is not running")]
    NotRunning,
    /// An inline [`invoke`](crate::Dispatcher::invoke) returned an error.
    #[error(transparent)]
    Action(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_are_declared_highest_first() {
        assert!(Priority::Send < Priority::Input);
        assert!(Priority::Render < Priority::Background);
        for (lane, p) in Priority::ALL.iter().enumerate() {
            assert_eq!(p.lane(), lane);
        }
    }

    #[test]
    fn merge_keys_compare_by_kind_and_id() {
        assert_eq!(MergeKey::render_pass(3), MergeKey::new("render-pass", 3));
        assert_ne!(MergeKey::render_pass(3), MergeKey::render_pass(4));
        assert_ne!(MergeKey::new("a", 1), MergeKey::new("b", 1));
    }
}
