// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Dispatch: the UI thread's work queue.
//!
//! A [`Dispatcher`] holds one FIFO lane per [`Priority`] and drains them highest first.
//! Any thread may queue work; only the owning thread runs it.
//!
//! - [`MergeKey`] coalesces equivalent pending work such as repeated repaint requests.
//! - [`DispatcherOperation`] observes or aborts a queued action.
//! - [`Signal`] lets another thread block until an action has been dealt with.
//! - Failures go to an exception handler. If none accepts the error the dispatcher enters
//!   [`DispatcherState::ShuttingDown`] and stops running work.
//!
//! ```
//! use arbor_dispatch::{Dispatcher, MergeKey, Priority};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let dispatcher = Dispatcher::new();
//! let paints = Arc::new(AtomicUsize::new(0));
//! for _ in 0..3 {
//!     let paints = paints.clone();
//!     dispatcher.enqueue_merged(Priority::Render, MergeKey::render_pass(1), move || {
//!         paints.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     });
//! }
//! assert_eq!(dispatcher.process().unwrap(), 1);
//! assert_eq!(paints.load(Ordering::SeqCst), 1);
//! ```

mod dispatcher;
mod operation;
mod types;

pub use dispatcher::{Action, Dispatcher};
pub use operation::{DispatcherOperation, OperationStatus, Signal};
pub use types::{DispatchError, DispatcherState, MergeKey, Priority};
