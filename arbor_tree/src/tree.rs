// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core tree implementation: structure, flags, effective state, hit testing.

use alloc::vec::Vec;
use kurbo::{Point, Rect, Size};

use crate::types::{DirtyFlags, ElementFlags, ElementId, ElementState};

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Retained element tree.
///
/// Children are owned by their parent's child list; the parent link is a plain
/// back-reference (an [`ElementId`]) and never keeps anything alive.
/// Several roots may coexist, which is how popups live next to a window's content.
pub struct Tree {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
}

impl core::fmt::Debug for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        let free = self.free_list.len();
        f.debug_struct("Tree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &free)
            .finish_non_exhaustive()
    }
}

/// Results of a hit test.
#[derive(Clone, Debug)]
pub struct Hit {
    /// The matched element (the deepest one under the point).
    pub node: ElementId,
    /// Path from root to element (inclusive).
    pub path: Vec<ElementId>,
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    generation: u32,
    pub(crate) parent: Option<ElementId>,
    pub(crate) children: Vec<ElementId>,
    pub(crate) flags: ElementFlags,
    pub(crate) state: ElementState,
    pub(crate) effectively_enabled: bool,
    pub(crate) dirty: DirtyFlags,
    pub(crate) desired_size: Size,
    pub(crate) last_available: Option<Size>,
    /// Arranged rect relative to the parent's arranged origin.
    pub(crate) bounds: Rect,
    pub(crate) last_final: Option<Rect>,
    pub(crate) world_bounds: Rect,
}

impl Node {
    fn new(generation: u32, flags: ElementFlags) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            flags,
            state: ElementState::empty(),
            effectively_enabled: flags.contains(ElementFlags::ENABLED),
            dirty: DirtyFlags::NEW,
            desired_size: Size::ZERO,
            last_available: None,
            bounds: Rect::ZERO,
            last_final: None,
            world_bounds: Rect::ZERO,
        }
    }
}

impl Tree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Insert a new element as the last child of `parent` (or as a root if `None`).
    ///
    /// A stale `parent` inserts a root.
    pub fn insert(&mut self, parent: Option<ElementId>, flags: ElementFlags) -> ElementId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, flags));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ElementId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, flags)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ElementId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        let id = ElementId::new(idx, generation);
        if let Some(p) = parent.filter(|p| self.is_alive(*p)) {
            self.link_parent(id, p);
            self.refresh_enabled(id);
            self.invalidate_measure(p);
        }
        id
    }

    /// Remove an element and its subtree.
    ///
    /// Returns the removed ids in pre-order so owners can release per-element resources.
    pub fn remove(&mut self, id: ElementId) -> Vec<ElementId> {
        let mut removed = Vec::new();
        if !self.is_alive(id) {
            return removed;
        }
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
            self.invalidate_measure(parent);
        }
        let mut stack = alloc::vec![id];
        while let Some(cur) = stack.pop() {
            removed.push(cur);
            if let Some(node) = self.nodes[cur.idx()].take() {
                stack.extend(node.children.iter().rev().copied());
            }
            self.free_list.push(cur.idx());
        }
        removed
    }

    /// Move `id` under `new_parent` (or make it a root).
    ///
    /// Callers must not move an element below one of its own descendants.
    pub fn reparent(&mut self, id: ElementId, new_parent: Option<ElementId>) {
        if !self.is_alive(id) {
            return;
        }
        debug_assert!(
            new_parent.is_none_or(|p| !self.is_ancestor_or_self(id, p)),
            "reparenting below a descendant would create a cycle"
        );
        if let Some(parent) = self.node(id).parent {
            self.unlink_parent(id, parent);
            self.invalidate_measure(parent);
        }
        if let Some(p) = new_parent.filter(|p| self.is_alive(*p)) {
            self.link_parent(id, p);
        }
        self.refresh_enabled(id);
        self.invalidate_measure(id);
    }

    /// Returns true if `id` refers to a live element.
    ///
    /// See [`ElementId`] docs for the generational semantics.
    pub fn is_alive(&self, id: ElementId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .is_some_and(|n| n.generation == id.1)
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns true if no element is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Structural parent of `id`.
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node_opt(id)?.parent
    }

    /// Children of `id` in insertion (paint) order. Empty for stale ids.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.node_opt(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Iterate live elements without a parent.
    pub fn roots(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| match n {
            Some(n) if n.parent.is_none() => {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "ElementId uses 32-bit indices by design."
                )]
                Some(ElementId::new(i as u32, n.generation))
            }
            _ => None,
        })
    }

    /// Number of structural ancestors of `id` (0 for a root).
    pub fn depth(&self, id: ElementId) -> usize {
        let mut depth = 0;
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            depth += 1;
            cur = self.parent(p);
        }
        depth
    }

    /// Returns true if `ancestor` is `id` or one of its structural ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.parent(c);
        }
        false
    }

    /// Topmost structural ancestor of `id` (itself when it is a root).
    pub fn root_of(&self, id: ElementId) -> ElementId {
        let mut cur = id;
        while let Some(p) = self.parent(cur) {
            cur = p;
        }
        cur
    }

    /// Flags of a live element.
    pub fn flags(&self, id: ElementId) -> Option<ElementFlags> {
        self.node_opt(id).map(|n| n.flags)
    }

    /// Replace the flags of an element.
    ///
    /// Changing [`ElementFlags::ENABLED`] recomputes the effective enabled state of the whole subtree.
    /// Changing [`ElementFlags::VISIBLE`] invalidates the measure of the element and its ancestors.
    pub fn set_flags(&mut self, id: ElementId, flags: ElementFlags) {
        let Some(node) = self.node_opt_mut(id) else {
            return;
        };
        let changed = node.flags ^ flags;
        node.flags = flags;
        if changed.contains(ElementFlags::ENABLED) {
            self.refresh_enabled(id);
        }
        if changed.contains(ElementFlags::VISIBLE) {
            self.invalidate_measure(id);
        }
    }

    /// Set or clear [`ElementFlags::ENABLED`].
    pub fn set_enabled(&mut self, id: ElementId, enabled: bool) {
        self.update_flag(id, ElementFlags::ENABLED, enabled);
    }

    /// Set or clear [`ElementFlags::VISIBLE`].
    pub fn set_visible(&mut self, id: ElementId, visible: bool) {
        self.update_flag(id, ElementFlags::VISIBLE, visible);
    }

    /// Set or clear [`ElementFlags::FOCUSABLE`].
    pub fn set_focusable(&mut self, id: ElementId, focusable: bool) {
        self.update_flag(id, ElementFlags::FOCUSABLE, focusable);
    }

    /// Set or clear [`ElementFlags::HIT_TEST_VISIBLE`].
    pub fn set_hit_test_visible(&mut self, id: ElementId, hit_test_visible: bool) {
        self.update_flag(id, ElementFlags::HIT_TEST_VISIBLE, hit_test_visible);
    }

    fn update_flag(&mut self, id: ElementId, flag: ElementFlags, on: bool) {
        if let Some(mut flags) = self.flags(id) {
            flags.set(flag, on);
            self.set_flags(id, flags);
        }
    }

    /// `ENABLED` of the element AND of every structural ancestor. False for stale ids.
    pub fn is_effectively_enabled(&self, id: ElementId) -> bool {
        self.node_opt(id).is_some_and(|n| n.effectively_enabled)
    }

    /// `VISIBLE` of the element AND of every structural ancestor. False for stale ids.
    pub fn is_effectively_visible(&self, id: ElementId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let mut cur = Some(id);
        while let Some(c) = cur {
            let node = self.node(c);
            if !node.flags.contains(ElementFlags::VISIBLE) {
                return false;
            }
            cur = node.parent;
        }
        true
    }

    /// Focusable, effectively enabled, and effectively visible.
    pub fn is_focus_eligible(&self, id: ElementId) -> bool {
        self.flags(id)
            .is_some_and(|f| f.contains(ElementFlags::FOCUSABLE))
            && self.is_effectively_enabled(id)
            && self.is_effectively_visible(id)
    }

    /// Interaction state of a live element.
    pub fn state(&self, id: ElementId) -> Option<ElementState> {
        self.node_opt(id).map(|n| n.state)
    }

    /// Set or clear interaction state bits. Returns true if the state changed.
    pub fn set_state(&mut self, id: ElementId, bits: ElementState, on: bool) -> bool {
        let Some(node) = self.node_opt_mut(id) else {
            return false;
        };
        let before = node.state;
        node.state.set(bits, on);
        before != node.state
    }

    /// Hit test a window-relative point against the subtree rooted at `root`.
    ///
    /// Returns the deepest element whose world bounds contain the point.
    /// Later siblings are tested first since they paint on top.
    /// Elements that are not visible or not hit-test visible are skipped with their subtree.
    pub fn hit_test_point(&self, root: ElementId, pt: Point) -> Option<Hit> {
        if !self.is_alive(root) {
            return None;
        }
        let node = self.hit_recursive(root, pt)?;
        Some(Hit {
            node,
            path: self.path_to_root(node),
        })
    }

    fn hit_recursive(&self, id: ElementId, pt: Point) -> Option<ElementId> {
        let node = self.node(id);
        if !node
            .flags
            .contains(ElementFlags::VISIBLE | ElementFlags::HIT_TEST_VISIBLE)
        {
            return None;
        }
        if !node.world_bounds.contains(pt) {
            return None;
        }
        for &child in node.children.iter().rev() {
            if let Some(hit) = self.hit_recursive(child, pt) {
                return Some(hit);
            }
        }
        Some(id)
    }

    /// Structural path from the root to `id` (inclusive).
    pub fn path_to_root(&self, mut id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        if !self.is_alive(id) {
            return out;
        }
        loop {
            out.push(id);
            match self.node(id).parent {
                Some(p) => id = p,
                None => break,
            }
        }
        out.reverse();
        out
    }

    // --- internals ---

    /// Access a node; panics if `id` is stale.
    pub(crate) fn node(&self, id: ElementId) -> &Node {
        self.node_opt(id).expect("dangling ElementId")
    }

    pub(crate) fn node_opt(&self, id: ElementId) -> Option<&Node> {
        let n = self.nodes.get(id.idx())?.as_ref()?;
        (n.generation == id.1).then_some(n)
    }

    pub(crate) fn node_opt_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        let n = self.nodes.get_mut(id.idx())?.as_mut()?;
        if n.generation != id.1 {
            return None;
        }
        Some(n)
    }

    fn link_parent(&mut self, id: ElementId, parent: ElementId) {
        if let Some(p) = self.node_opt_mut(parent) {
            p.children.push(id);
        }
        if let Some(n) = self.node_opt_mut(id) {
            n.parent = Some(parent);
        }
    }

    fn unlink_parent(&mut self, id: ElementId, parent: ElementId) {
        if let Some(p) = self.node_opt_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        if let Some(n) = self.node_opt_mut(id) {
            n.parent = None;
        }
    }

    /// Recompute the cached effective enabled state for `id` and its subtree.
    fn refresh_enabled(&mut self, id: ElementId) {
        let inherited = self
            .parent(id)
            .is_none_or(|p| self.is_effectively_enabled(p));
        let mut stack = alloc::vec![(id, inherited)];
        while let Some((cur, inherited)) = stack.pop() {
            let Some(node) = self.node_opt_mut(cur) else {
                continue;
            };
            let effective = inherited && node.flags.contains(ElementFlags::ENABLED);
            node.effectively_enabled = effective;
            stack.extend(node.children.iter().map(|&c| (c, effective)));
        }
    }
}
