// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural traversal helpers.
//!
//! [`visit`], [`find`], and [`find_all`] walk a subtree depth-first in pre-order using only
//! the [`ChildHost`] capability. They keep no side tables and do not detect cycles: the
//! tree's ownership discipline already rules them out.
//!
//! Back-reference walks (popup owners, default focus redirects) are different. Those links
//! are set by application code and may form a loop, so [`bounded_walk`] caps the number of
//! hops and tracks visited nodes.

use alloc::vec::Vec;
use core::ops::ControlFlow;

use crate::tree::Tree;
use crate::types::ElementId;

/// Hop cap for popup-owner and other ancestor back-reference walks.
pub const MAX_OWNER_HOPS: usize = 32;

/// Hop cap for "redirect focus to my default child" chains.
pub const MAX_DEFAULT_FOCUS_HOPS: usize = 8;

/// Anything that can enumerate the children of a node.
///
/// Nodes without children simply never call `f`.
pub trait ChildHost<K> {
    /// Call `f` for every child of `node`, in order.
    fn for_each_child(&self, node: K, f: &mut dyn FnMut(K));
}

impl ChildHost<ElementId> for Tree {
    fn for_each_child(&self, node: ElementId, f: &mut dyn FnMut(ElementId)) {
        for &child in self.children(node) {
            f(child);
        }
    }
}

fn walk<K, H, B>(host: &H, root: K, mut f: impl FnMut(K) -> ControlFlow<B>) -> ControlFlow<B>
where
    K: Copy,
    H: ChildHost<K> + ?Sized,
{
    let mut stack = alloc::vec![root];
    let mut scratch = Vec::new();
    while let Some(node) = stack.pop() {
        if let ControlFlow::Break(b) = f(node) {
            return ControlFlow::Break(b);
        }
        scratch.clear();
        host.for_each_child(node, &mut |c| scratch.push(c));
        stack.extend(scratch.iter().rev().copied());
    }
    ControlFlow::Continue(())
}

/// Call `visitor` on `root` and then on every descendant, depth-first, pre-order.
pub fn visit<K, H>(host: &H, root: K, mut visitor: impl FnMut(K))
where
    K: Copy,
    H: ChildHost<K> + ?Sized,
{
    let _ = walk(host, root, |k| {
        visitor(k);
        ControlFlow::<()>::Continue(())
    });
}

/// First node in pre-order that satisfies `pred`.
pub fn find<K, H>(host: &H, root: K, mut pred: impl FnMut(K) -> bool) -> Option<K>
where
    K: Copy,
    H: ChildHost<K> + ?Sized,
{
    match walk(host, root, |k| {
        if pred(k) {
            ControlFlow::Break(k)
        } else {
            ControlFlow::Continue(())
        }
    }) {
        ControlFlow::Break(k) => Some(k),
        ControlFlow::Continue(()) => None,
    }
}

/// Every node that satisfies `pred`, in pre-order.
pub fn find_all<K, H>(host: &H, root: K, mut pred: impl FnMut(K) -> bool) -> Vec<K>
where
    K: Copy,
    H: ChildHost<K> + ?Sized,
{
    let mut out = Vec::new();
    visit(host, root, |k| {
        if pred(k) {
            out.push(k);
        }
    });
    out
}

/// Why a [`bounded_walk`] stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WalkEnd {
    /// `next` returned `None`.
    Exhausted,
    /// `next` returned a node that was already visited.
    Cycle,
    /// The hop cap was reached while more links remained.
    HopLimit,
}

/// Result of a [`bounded_walk`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundedWalk<K> {
    /// Visited nodes, starting with the start node, in walk order.
    pub visited: Vec<K>,
    /// Why the walk stopped.
    pub end: WalkEnd,
}

impl<K: Copy> BoundedWalk<K> {
    /// Last node reached.
    pub fn last(&self) -> K {
        *self.visited.last().expect("a walk always contains its start node")
    }
}

/// Follow `next` from `start`, taking at most `max_hops` links and never revisiting a node.
pub fn bounded_walk<K: Copy + Eq + core::fmt::Debug>(
    start: K,
    max_hops: usize,
    mut next: impl FnMut(K) -> Option<K>,
) -> BoundedWalk<K> {
    let mut visited = alloc::vec![start];
    let mut cur = start;
    let end = loop {
        let Some(n) = next(cur) else {
            break WalkEnd::Exhausted;
        };
        if visited.contains(&n) {
            log::warn!("back-reference cycle at {n:?} after {} hops", visited.len() - 1);
            break WalkEnd::Cycle;
        }
        if visited.len() > max_hops {
            log::warn!("back-reference walk from {start:?} cut at {max_hops} hops");
            break WalkEnd::HopLimit;
        }
        visited.push(n);
        cur = n;
    };
    BoundedWalk { visited, end }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementFlags;
    use alloc::vec;

    struct Adjacency(Vec<Vec<u32>>);

    impl ChildHost<u32> for Adjacency {
        fn for_each_child(&self, node: u32, f: &mut dyn FnMut(u32)) {
            if let Some(children) = self.0.get(node as usize) {
                for &c in children {
                    f(c);
                }
            }
        }
    }

    //     0
    //   1   4
    //  2 3   5
    fn sample() -> Adjacency {
        Adjacency(vec![vec![1, 4], vec![2, 3], vec![], vec![], vec![5]])
    }

    #[test]
    fn visit_is_preorder_depth_first() {
        let mut order = Vec::new();
        visit(&sample(), 0, |k| order.push(k));
        assert_eq!(order, [0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn leaf_without_children_is_fine() {
        let mut order = Vec::new();
        visit(&sample(), 5, |k| order.push(k));
        assert_eq!(order, [5]);
    }

    #[test]
    fn find_returns_first_in_preorder() {
        assert_eq!(find(&sample(), 0, |k| k >= 3), Some(3));
        assert_eq!(find(&sample(), 0, |k| k > 10), None);
        assert_eq!(find_all(&sample(), 0, |k| k % 2 == 1), [1, 3, 5]);
    }

    #[test]
    fn tree_is_a_child_host() {
        let mut tree = Tree::new();
        let root = tree.insert(None, ElementFlags::default());
        let a = tree.insert(Some(root), ElementFlags::default());
        let a1 = tree.insert(Some(a), ElementFlags::default());
        let b = tree.insert(Some(root), ElementFlags::default() | ElementFlags::FOCUSABLE);
        let mut order = Vec::new();
        visit(&tree, root, |k| order.push(k));
        assert_eq!(order, [root, a, a1, b]);
        let focusable = find_all(&tree, root, |k| {
            tree.flags(k)
                .is_some_and(|f| f.contains(ElementFlags::FOCUSABLE))
        });
        assert_eq!(focusable, [b]);
    }

    #[test]
    fn bounded_walk_follows_links() {
        let walk = bounded_walk(1_u32, MAX_OWNER_HOPS, |k| (k < 4).then_some(k + 1));
        assert_eq!(walk.visited, [1, 2, 3, 4]);
        assert_eq!(walk.end, WalkEnd::Exhausted);
        assert_eq!(walk.last(), 4);
    }

    #[test]
    fn bounded_walk_stops_on_cycle() {
        // 1 -> 2 -> 3 -> 1
        let walk = bounded_walk(1_u32, MAX_OWNER_HOPS, |k| Some(k % 3 + 1));
        assert_eq!(walk.visited, [1, 2, 3]);
        assert_eq!(walk.end, WalkEnd::Cycle);
    }

    #[test]
    fn bounded_walk_respects_hop_cap() {
        let walk = bounded_walk(0_u32, MAX_DEFAULT_FOCUS_HOPS, |k| Some(k + 1));
        assert_eq!(walk.visited.len(), MAX_DEFAULT_FOCUS_HOPS + 1);
        assert_eq!(walk.last(), 8);
        assert_eq!(walk.end, WalkEnd::HopLimit);
    }
}
