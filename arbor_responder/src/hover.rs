// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover state helper: compute enter/leave transitions from mouse-over chain changes.
//!
//! ## Usage
//!
//! 1) Resolve the pointer target (captured node or hit-test result).
//! 2) Build its root→target chain with [`Router::chain`](crate::router::Router::chain), or
//!    recover it from a route with [`path_from_dispatch`].
//! 3) Call [`HoverState::update_path`] with that chain to get `Enter(..)` / `Leave(..)` transitions.
//!
//! ## Minimal example
//!
//! ```
//! use arbor_responder::hover::{HoverState, HoverEvent};
//! let mut h: HoverState<u32> = HoverState::new();
//! assert_eq!(h.update_path(&[1, 2]), vec![HoverEvent::Enter(1), HoverEvent::Enter(2)]);
//! assert_eq!(h.update_path(&[1, 3]), vec![HoverEvent::Leave(2), HoverEvent::Enter(3)]);
//! ```

use alloc::vec::Vec;

use crate::types::Dispatch;

/// Length of the shared root-side prefix of two chains.
pub(crate) fn common_prefix<K: Eq>(a: &[K], b: &[K]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// A hover state machine over root→target chains.
///
/// Tracks the current mouse-over chain and, when updated with a new chain, computes the
/// nodes that left it and the nodes that joined it.
///
/// Ordering semantics:
/// - Leave events are emitted from inner-most to outer-most.
/// - Enter events are emitted from outer-most to inner-most.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HoverState<K: Copy + Eq> {
    current: Vec<K>,
}

/// A hover transition event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HoverEvent<K> {
    /// Pointer enters the given node (in order from outer→inner).
    Enter(K),
    /// Pointer leaves the given node (in order from inner→outer).
    Leave(K),
}

impl<K: Copy + Eq> HoverState<K> {
    /// Create an empty hover state.
    pub fn new() -> Self {
        Self {
            current: Vec::new(),
        }
    }

    /// Return the current root→target chain (if any).
    pub fn current_path(&self) -> &[K] {
        &self.current
    }

    /// The node directly under the pointer.
    pub fn target(&self) -> Option<K> {
        self.current.last().copied()
    }

    /// Returns true if `node` is anywhere on the current chain.
    pub fn contains(&self, node: K) -> bool {
        self.current.contains(&node)
    }

    /// Clear the current chain, returning the corresponding leave events
    /// from inner-most to outer-most.
    pub fn clear(&mut self) -> Vec<HoverEvent<K>> {
        let out = self.current.iter().rev().map(|&k| HoverEvent::Leave(k)).collect();
        self.current.clear();
        out
    }

    /// Update the chain and return the enter/leave events required to move from the
    /// previous chain to `new_path`.
    ///
    /// Nodes present in both chains (the shared ancestry) receive nothing.
    pub fn update_path(&mut self, new_path: &[K]) -> Vec<HoverEvent<K>> {
        let lca = common_prefix(&self.current, new_path);

        let mut out = Vec::new();
        for &k in self.current[lca..].iter().rev() {
            // A popup-aware chain can revisit a node below the divergence point.
            if !new_path.contains(&k) {
                out.push(HoverEvent::Leave(k));
            }
        }
        for &k in &new_path[lca..] {
            if !self.current.contains(&k) {
                out.push(HoverEvent::Enter(k));
            }
        }

        self.current.clear();
        self.current.extend_from_slice(new_path);
        out
    }

    /// Drop `node` and everything inside it from the chain without emitting events.
    ///
    /// Used when the node is removed from the tree.
    pub fn forget(&mut self, node: K) {
        if let Some(i) = self.current.iter().position(|&k| k == node) {
            self.current.truncate(i);
        }
    }
}

/// Recover a root→target chain from a router sequence.
///
/// The sequence lists the target first and then its bubble ancestors, so the chain is
/// simply the nodes in reverse.
pub fn path_from_dispatch<K: Copy>(seq: &[Dispatch<K>]) -> Vec<K> {
    seq.iter().rev().map(|d| d.node).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    // Fresh path: expect outer→inner enters.
    #[test]
    fn hover_enter_on_fresh_path() {
        let mut h: HoverState<u32> = HoverState::new();
        let ev = h.update_path(&[1, 2, 3]);
        assert_eq!(
            ev,
            vec![
                HoverEvent::Enter(1),
                HoverEvent::Enter(2),
                HoverEvent::Enter(3)
            ]
        );
        assert_eq!(h.current_path(), &[1, 2, 3]);
        assert_eq!(h.target(), Some(3));
    }

    // Clearing path: expect inner→outer leaves.
    #[test]
    fn hover_leave_to_empty() {
        let mut h: HoverState<u32> = HoverState::new();
        let _ = h.update_path(&[1, 2]);
        let ev = h.clear();
        assert_eq!(ev, vec![HoverEvent::Leave(2), HoverEvent::Leave(1)]);
        assert!(h.current_path().is_empty());
    }

    // Branch change with shallow LCA: leave inner tail, then enter new branch.
    #[test]
    fn hover_branch_change() {
        let mut h: HoverState<u32> = HoverState::new();
        let _ = h.update_path(&[1, 2, 3]);
        let ev = h.update_path(&[1, 4]);
        assert_eq!(
            ev,
            vec![
                HoverEvent::Leave(3),
                HoverEvent::Leave(2),
                HoverEvent::Enter(4)
            ]
        );
        assert_eq!(h.current_path(), &[1, 4]);
    }

    // Disjoint paths: leave entire old path, enter entire new path.
    #[test]
    fn hover_disjoint_paths() {
        let mut h: HoverState<u32> = HoverState::new();
        let _ = h.update_path(&[1, 2, 3]);
        let ev = h.update_path(&[4, 5]);
        assert_eq!(
            ev,
            vec![
                HoverEvent::Leave(3),
                HoverEvent::Leave(2),
                HoverEvent::Leave(1),
                HoverEvent::Enter(4),
                HoverEvent::Enter(5),
            ]
        );
    }

    // Same path repeated: no transitions.
    #[test]
    fn hover_same_path_no_events() {
        let mut h: HoverState<u32> = HoverState::new();
        let _ = h.update_path(&[7, 8]);
        assert!(h.update_path(&[7, 8]).is_empty());
    }

    // Moving from an owner into its popup keeps the owner chain entered.
    #[test]
    fn hover_into_popup_keeps_owner_chain() {
        let mut h: HoverState<u32> = HoverState::new();
        // Window root 1, owner 3 under 2.
        let _ = h.update_path(&[1, 2, 3]);
        // Popup root 12 owned by 3, item 11 inside it.
        let ev = h.update_path(&[1, 2, 3, 12, 11]);
        assert_eq!(ev, vec![HoverEvent::Enter(12), HoverEvent::Enter(11)]);
        assert!(h.contains(3));
    }

    // Nodes that merely change position in the chain are neither left nor entered.
    #[test]
    fn hover_reordered_chain_is_a_symmetric_difference() {
        let mut h: HoverState<u32> = HoverState::new();
        let _ = h.update_path(&[1, 5, 2]);
        let ev = h.update_path(&[1, 2, 6]);
        assert_eq!(ev, vec![HoverEvent::Leave(5), HoverEvent::Enter(6)]);
    }

    #[test]
    fn forget_truncates_silently() {
        let mut h: HoverState<u32> = HoverState::new();
        let _ = h.update_path(&[1, 2, 3]);
        h.forget(2);
        assert_eq!(h.current_path(), &[1]);
        h.forget(42);
        assert_eq!(h.current_path(), &[1]);
    }

    #[test]
    fn path_from_dispatch_reverses_route() {
        let seq = [Dispatch::target(3_u32), Dispatch::bubble(2), Dispatch::bubble(1)];
        assert_eq!(path_from_dispatch(&seq), [1, 2, 3]);
    }
}
