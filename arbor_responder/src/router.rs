// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Router implementation.
//!
//! ## Overview
//!
//! Resolves the target of an event and emits a target → bubble sequence for it.
//!
//! ## Target Selection
//!
//! - Pointer events: the captured node if capture is set, otherwise the hit-test result.
//! - Keyboard events: the focused node, via [`Router::dispatch_for`]; capture is ignored.
//! - A missing target yields an empty sequence. That is a valid result, not an error.
//!
//! ## Bubbling
//!
//! After the target, the sequence follows [`BubbleParent`] links toward the root.
//! Links are application-defined (popup owners), so the walk stops at the first revisit
//! and after [`Router::max_hops`] links.
//!
//! ## See Also
//!
//! [`hover`](crate::hover) for hover transitions derived from [`Router::chain`].

use alloc::vec::Vec;
use core::fmt::Debug;

use arbor_tree::traverse::{WalkEnd, bounded_walk};

use crate::types::{BubbleParent, Dispatch, NoParent};

/// Default cap on bubble links followed from a target.
pub const DEFAULT_MAX_HOPS: usize = 1024;

/// Deterministic responder chain router.
///
/// ## Usage
///
/// - Construct with [`Router::with_parent`] over the window's popup-aware parent lookup.
/// - Set or clear pointer capture with [`Router::capture`].
/// - Call [`Router::route`] for pointer input and [`Router::dispatch_for`] for keyboard input.
#[derive(Clone)]
pub struct Router<K, P: BubbleParent<K> = NoParent> {
    pub(crate) parent: P,
    pub(crate) capture: Option<K>,
    pub(crate) max_hops: usize,
}

impl<K: Debug, P: BubbleParent<K>> Debug for Router<K, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Router")
            .field("capture", &self.capture)
            .field("max_hops", &self.max_hops)
            .finish_non_exhaustive()
    }
}

impl<K: Copy + Eq + Debug, P: BubbleParent<K> + Default> Router<K, P> {
    /// Create a router with a default parent lookup.
    pub fn new() -> Self {
        Self::with_parent(P::default())
    }
}

impl<K: Copy + Eq + Debug, P: BubbleParent<K> + Default> Default for Router<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Debug, P: BubbleParent<K>> Router<K, P> {
    /// Create a router with an explicit parent lookup provider.
    pub fn with_parent(parent: P) -> Self {
        Self {
            parent,
            capture: None,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    /// Set the captured node for pointer events; `None` releases capture.
    pub fn capture(&mut self, node: Option<K>) {
        self.capture = node;
    }

    /// Builder form of [`Router::capture`].
    #[must_use]
    pub fn with_capture(mut self, node: Option<K>) -> Self {
        self.capture = node;
        self
    }

    /// The captured node, if any.
    pub fn captured(&self) -> Option<K> {
        self.capture
    }

    /// Cap on bubble links followed from a target.
    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Change the bubble link cap.
    pub fn set_max_hops(&mut self, max_hops: usize) {
        self.max_hops = max_hops;
    }

    /// The node pointer input goes to: the captured node, else `hit`.
    pub fn resolve(&self, hit: Option<K>) -> Option<K> {
        self.capture.or(hit)
    }

    /// Route a pointer event given the hit-test result.
    ///
    /// Capture overrides `hit` entirely.
    pub fn route(&self, hit: Option<K>) -> Vec<Dispatch<K>> {
        self.dispatch_for(self.resolve(hit))
    }

    /// Route an event to `node` (typically the focused node), ignoring capture.
    pub fn dispatch_for(&self, node: Option<K>) -> Vec<Dispatch<K>> {
        let Some(node) = node else {
            return Vec::new();
        };
        let mut up = self.bubble_path(node).into_iter();
        let mut out = Vec::with_capacity(up.len());
        if let Some(target) = up.next() {
            out.push(Dispatch::target(target));
        }
        out.extend(up.map(Dispatch::bubble));
        out
    }

    /// `node` followed by its bubble ancestors, target → root.
    pub fn bubble_path(&self, node: K) -> Vec<K> {
        let walk = bounded_walk(node, self.max_hops, |k| self.parent.bubble_parent(&k));
        if walk.end != WalkEnd::Exhausted {
            log::debug!("bubble path from {node:?} ended early: {:?}", walk.end);
        }
        walk.visited
    }

    /// Root → `node` chain along bubble parents, as used for hover and focus-within.
    pub fn chain(&self, node: K) -> Vec<K> {
        let mut path = self.bubble_path(node);
        path.reverse();
        path
    }
}
