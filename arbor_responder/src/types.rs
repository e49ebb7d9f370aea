// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for the responder: phases, outcomes, parent lookup, and dispatch steps.
//!
//! ## Overview
//!
//! These types describe the responder protocol and its inputs/outputs.
//! They are referenced by the [`router`](crate::router) and consumed by the window layer.

/// Phases of event propagation.
///
/// Appears on each [`Dispatch`] item produced by
/// [`Router::route`](crate::router::Router::route).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// The hit-tested, captured, or focused node.
    Target,
    /// Target-to-root traversal along bubble parents.
    Bubble,
}

/// Handler outcome controlling propagation.
///
/// [`dispatcher::run`](crate::dispatcher::run) stops at the first `Handled`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Offer the event to the next node.
    Continue,
    /// The event was handled; no further node receives it.
    Handled,
}

impl Outcome {
    /// `Handled` if `handled` is true, `Continue` otherwise.
    pub fn from_handled(handled: bool) -> Self {
        if handled { Self::Handled } else { Self::Continue }
    }

    /// Returns true for [`Outcome::Handled`].
    pub fn is_handled(self) -> bool {
        matches!(self, Self::Handled)
    }
}

/// Look up the node an event bubbles to after `node`.
///
/// Usually the structural parent. Popup roots bubble to the element that opened them
/// instead; see [`PopupAware`](crate::adapters::tree::PopupAware).
///
/// The router consults this when building a route, and guards against cycles, so
/// implementations may return arbitrary application-defined links.
pub trait BubbleParent<K> {
    /// Returns the next node up from `node`, or `None` if `node` is a root.
    fn bubble_parent(&self, node: &K) -> Option<K>;
}

impl<K, T: BubbleParent<K> + ?Sized> BubbleParent<K> for &T {
    #[inline]
    fn bubble_parent(&self, node: &K) -> Option<K> {
        (**self).bubble_parent(node)
    }
}

/// A no‑op parent provider: every node is a root.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoParent;

impl<K> BubbleParent<K> for NoParent {
    #[inline]
    fn bubble_parent(&self, _node: &K) -> Option<K> {
        None
    }
}

/// A single dispatch item.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Dispatch<K> {
    /// Propagation phase for this step.
    pub phase: Phase,
    /// Node receiving this step.
    pub node: K,
}

impl<K> Dispatch<K> {
    /// Target step for `node`.
    pub fn target(node: K) -> Self {
        Self {
            phase: Phase::Target,
            node,
        }
    }

    /// Bubble step for `node`.
    pub fn bubble(node: K) -> Self {
        Self {
            phase: Phase::Bubble,
            node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_from_handled_flag() {
        assert_eq!(Outcome::from_handled(true), Outcome::Handled);
        assert_eq!(Outcome::from_handled(false), Outcome::Continue);
        assert!(Outcome::Handled.is_handled());
        assert!(!Outcome::Continue.is_handled());
    }

    #[test]
    fn references_forward_parent_lookup() {
        struct Halve;
        impl BubbleParent<u32> for Halve {
            fn bubble_parent(&self, node: &u32) -> Option<u32> {
                (*node > 1).then_some(node / 2)
            }
        }
        let by_ref = &Halve;
        assert_eq!(by_ref.bubble_parent(&8), Some(4));
        assert_eq!(by_ref.bubble_parent(&1), None);
        assert_eq!(BubbleParent::<u32>::bubble_parent(&NoParent, &8), None);
    }
}
