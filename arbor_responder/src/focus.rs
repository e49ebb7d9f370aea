// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Focus state helper: the focused node and its focus-within chain.
//!
//! [`FocusState`] does not decide whether a node may take focus; the window layer checks
//! eligibility first. Given the accepted node's root→target chain (popup-aware, so an
//! element inside a popup keeps its owner's ancestors focus-within), it reports which nodes
//! lost and gained focus-within and which node lost and gained focus itself.

use alloc::vec::Vec;

use crate::hover::common_prefix;

/// A focus transition event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FocusEvent<K> {
    /// The node stopped being focused.
    Blur(K),
    /// The node is no longer on the focused chain (inner→outer).
    LeaveWithin(K),
    /// The node joined the focused chain (outer→inner).
    EnterWithin(K),
    /// The node became focused.
    Focus(K),
}

/// Focused node plus the chain it was focused through.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FocusState<K: Copy + Eq> {
    chain: Vec<K>,
}

impl<K: Copy + Eq> FocusState<K> {
    /// Create an unfocused state.
    pub fn new() -> Self {
        Self { chain: Vec::new() }
    }

    /// The focused node.
    pub fn focused(&self) -> Option<K> {
        self.chain.last().copied()
    }

    /// Root→focused chain.
    pub fn chain(&self) -> &[K] {
        &self.chain
    }

    /// Returns true if `node` is focused or an ancestor of the focused node.
    pub fn is_within(&self, node: K) -> bool {
        self.chain.contains(&node)
    }

    /// Move focus to the last node of `chain`, or clear it if `chain` is empty.
    ///
    /// Events come in the order they should be delivered: blur of the old node, then
    /// focus-within leaves, then focus-within enters, then focus of the new node. Moving
    /// to the already-focused node along the same chain yields nothing.
    pub fn update_chain(&mut self, chain: &[K]) -> Vec<FocusEvent<K>> {
        let mut out = Vec::new();
        let old = self.focused();
        let new = chain.last().copied();
        if old != new
            && let Some(o) = old
        {
            out.push(FocusEvent::Blur(o));
        }
        let lca = common_prefix(&self.chain, chain);
        for &k in self.chain[lca..].iter().rev() {
            if !chain.contains(&k) {
                out.push(FocusEvent::LeaveWithin(k));
            }
        }
        for &k in &chain[lca..] {
            if !self.chain.contains(&k) {
                out.push(FocusEvent::EnterWithin(k));
            }
        }
        if old != new
            && let Some(n) = new
        {
            out.push(FocusEvent::Focus(n));
        }
        self.chain.clear();
        self.chain.extend_from_slice(chain);
        out
    }

    /// Clear focus. Same as `update_chain(&[])`.
    pub fn clear(&mut self) -> Vec<FocusEvent<K>> {
        self.update_chain(&[])
    }
}
