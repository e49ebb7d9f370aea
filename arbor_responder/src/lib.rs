// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Responder: a deterministic, `no_std` router for UI events.
//!
//! ## Overview
//!
//! This crate turns a resolved target (hit-test result, pointer capture, or keyboard focus)
//! into a target → bubble sequence you can dispatch, and keeps the bookkeeping needed to
//! turn target changes into notifications.
//! It does not perform hit testing itself; [`adapters::tree`] bridges to [`arbor_tree`].
//!
//! ## Bubbling
//!
//! A [`BubbleParent`](types::BubbleParent) supplies the next node up. For ordinary
//! elements that is the structural parent. A popup root bubbles to the element that opened
//! it, so unhandled input inside a dropdown reaches the control that owns the dropdown.
//! Owner links are application data and may be malformed; the router stops at the first
//! revisited node and after a hop cap.
//!
//! ## Pointer capture
//!
//! If capture is set, [`Router::route`](router::Router::route) targets the captured node
//! regardless of the hit-test result. Keyboard routes via
//! [`Router::dispatch_for`](router::Router::dispatch_for) ignore capture.
//!
//! ## Workflow
//!
//! 1) Route: build the sequence for the target.
//! 2) Dispatch: [`dispatcher::run`] calls your handler on each step and stops at the first
//!    [`Outcome::Handled`](types::Outcome::Handled).
//! 3) Hover: feed the target's [`chain`](router::Router::chain) to
//!    [`HoverState`](hover::HoverState) for leave (inner→outer) and enter (outer→inner) events.
//! 4) Focus: feed the newly focused node's chain to [`FocusState`](focus::FocusState) for
//!    blur, focus-within, and focus events.
//! 5) Text: [`TextInputSuppression`](text_input::TextInputSuppression) drops the committed
//!    `'\t'`/`'\r'` that follows a handled Tab/Enter key-down.
//!
//! ```
//! use arbor_responder::router::Router;
//! use arbor_responder::types::{BubbleParent, Outcome};
//! use arbor_responder::dispatcher;
//!
//! struct Parents;
//! impl BubbleParent<u32> for Parents {
//!     fn bubble_parent(&self, node: &u32) -> Option<u32> {
//!         (*node > 1).then(|| node - 1)
//!     }
//! }
//!
//! let router = Router::with_parent(Parents);
//! let seq = router.route(Some(3));
//! let mut offered = Vec::new();
//! let handled_at = dispatcher::run(&seq, |d| {
//!     offered.push(d.node);
//!     Outcome::from_handled(d.node == 2)
//! });
//! assert_eq!(handled_at, Some(1));
//! assert_eq!(offered, [3, 2]);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod adapters;
pub mod dispatcher;
pub mod focus;
pub mod hover;
pub mod router;
pub mod text_input;
pub mod types;
