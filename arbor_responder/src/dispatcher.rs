// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Execute handlers over a responder sequence.
//!
//! ```
//! use arbor_responder::dispatcher;
//! use arbor_responder::types::{Dispatch, Outcome};
//!
//! let seq = [Dispatch::target(3_u32), Dispatch::bubble(2), Dispatch::bubble(1)];
//! let mut seen = Vec::new();
//! let stop_at = dispatcher::run(&seq, |d| {
//!     seen.push(d.node);
//!     Outcome::from_handled(d.node == 2)
//! });
//! assert_eq!(stop_at, Some(1));
//! assert_eq!(seen, [3, 2]);
//! ```

use crate::types::{Dispatch, Outcome};

/// Call `handler` on each step in order until one reports [`Outcome::Handled`].
///
/// Returns the index of the handling step, or `None` if every step continued.
pub fn run<K>(
    seq: &[Dispatch<K>],
    mut handler: impl FnMut(&Dispatch<K>) -> Outcome,
) -> Option<usize> {
    seq.iter().position(|d| handler(d).is_handled())
}
