// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Tree: the retained element tree behind an Arbor window.
//!
//! - Represents a hierarchy of elements with generational ids, flags, and interaction state.
//! - Caches the effective enabled state so an ancestor's `ENABLED` flag is honored by every descendant.
//! - Implements the measure/arrange contract with short-circuiting invalidation.
//! - Provides hit testing over arranged bounds and structural traversal helpers.
//!
//! ## Where this fits
//!
//! - Element tree: structure, layout, and geometry (this crate).
//! - Responder: route construction and transition bookkeeping (`arbor_responder`).
//! - Window: controls, focus, input routing, and the platform boundary (`arbor_window`).
//!
//! ## Ownership
//!
//! Children are owned by the tree and listed by their parent.
//! The parent link is a plain [`ElementId`] back-reference: it never keeps anything alive,
//! and removing a subtree frees every slot in it.
//! Several roots may coexist (a window's content and its open popups).
//!
//! ## API overview
//!
//! - [`Tree`]: element arena.
//! - [`ElementFlags`]: visibility, enablement, focusability, hit-test participation.
//! - [`ElementState`]: focus, focus-within, pointer-over, capture bits kept by the window layer.
//! - [`DirtyFlags`]: pending measure, arrange, and repaint work.
//! - [`LayoutDelegate`]: element-specific measure/arrange logic; [`OverlayLayout`] is the stock one.
//! - [`traverse`]: [`visit`](traverse::visit), [`find`](traverse::find),
//!   [`find_all`](traverse::find_all), and [`bounded_walk`](traverse::bounded_walk).
//!
//! ### Minimal usage
//!
//! ```
//! use arbor_tree::{ElementFlags, OverlayLayout, Tree};
//! use kurbo::{Point, Rect, Size};
//!
//! let mut tree = Tree::new();
//! let root = tree.insert(None, ElementFlags::default());
//! let child = tree.insert(Some(root), ElementFlags::default());
//!
//! let mut layout = OverlayLayout;
//! let size = Size::new(200.0, 100.0);
//! tree.measure(root, size, &mut layout).unwrap();
//! tree.arrange(root, Rect::from_origin_size(Point::ZERO, size), &mut layout).unwrap();
//!
//! let hit = tree.hit_test_point(root, Point::new(10.0, 10.0)).unwrap();
//! assert_eq!(hit.node, child);
//!
//! // Invalidation walks up until it meets an already-dirty ancestor.
//! assert_eq!(tree.invalidate_measure(child), 2);
//! assert!(tree.needs_layout(root));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod layout;
pub mod traverse;
mod tree;
mod types;

pub use layout::{LayoutDelegate, LayoutError, OverlayLayout, overlay_arrange, overlay_measure};
pub use tree::{Hit, Tree};
pub use types::{DirtyFlags, ElementFlags, ElementId, ElementState};
