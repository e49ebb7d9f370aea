// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adapter helpers for the Arbor element tree.
//!
//! - [`Tree`] itself is a [`BubbleParent`] over structural parents.
//! - [`PopupAware`] redirects popup roots to their owners.
//! - [`route_point`] hit-tests a root and routes the result in one step.

use alloc::vec::Vec;

use arbor_tree::{ElementId, Tree};
use kurbo::Point;

use crate::router::Router;
use crate::types::{BubbleParent, Dispatch};

impl BubbleParent<ElementId> for Tree {
    #[inline]
    fn bubble_parent(&self, node: &ElementId) -> Option<ElementId> {
        self.parent(*node)
    }
}

/// Popup-aware parent lookup.
///
/// A node with a registered owner (a popup root) bubbles to that owner; every other node
/// bubbles to its structural parent.
pub struct PopupAware<'a, F> {
    tree: &'a Tree,
    owner_of: F,
}

impl<F> core::fmt::Debug for PopupAware<'_, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PopupAware").finish_non_exhaustive()
    }
}

impl<'a, F: Fn(ElementId) -> Option<ElementId>> PopupAware<'a, F> {
    /// Wrap `tree`, consulting `owner_of` for popup owners.
    pub fn new(tree: &'a Tree, owner_of: F) -> Self {
        Self { tree, owner_of }
    }
}

impl<F: Fn(ElementId) -> Option<ElementId>> BubbleParent<ElementId> for PopupAware<'_, F> {
    fn bubble_parent(&self, node: &ElementId) -> Option<ElementId> {
        (self.owner_of)(*node).or_else(|| self.tree.parent(*node))
    }
}

/// Hit-test `root` at `pt` (unless the router has capture) and route the result.
pub fn route_point<P: BubbleParent<ElementId>>(
    router: &Router<ElementId, P>,
    tree: &Tree,
    root: ElementId,
    pt: Point,
) -> Vec<Dispatch<ElementId>> {
    if router.captured().is_some() {
        return router.route(None);
    }
    router.route(tree.hit_test_point(root, pt).map(|hit| hit.node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Phase;
    use arbor_tree::{ElementFlags, OverlayLayout};
    use kurbo::{Rect, Size};

    fn laid_out(tree: &mut Tree, root: ElementId, size: Size) {
        let mut layout = OverlayLayout;
        tree.measure(root, size, &mut layout).unwrap();
        tree.arrange(root, Rect::from_origin_size(Point::ZERO, size), &mut layout)
            .unwrap();
    }

    #[test]
    fn popup_root_bubbles_to_owner_not_parent() {
        let mut tree = Tree::new();
        let window_root = tree.insert(None, ElementFlags::default());
        let owner = tree.insert(Some(window_root), ElementFlags::default());
        let popup_root = tree.insert(None, ElementFlags::default());
        let item = tree.insert(Some(popup_root), ElementFlags::default());
        laid_out(&mut tree, popup_root, Size::new(50.0, 50.0));

        let owners = |id: ElementId| (id == popup_root).then_some(owner);
        let router = Router::with_parent(PopupAware::new(&tree, owners));
        let out = route_point(&router, &tree, popup_root, Point::new(5.0, 5.0));
        let nodes: Vec<(Phase, ElementId)> = out.iter().map(|d| (d.phase, d.node)).collect();
        assert_eq!(
            nodes,
            [
                (Phase::Target, item),
                (Phase::Bubble, popup_root),
                (Phase::Bubble, owner),
                (Phase::Bubble, window_root),
            ]
        );
    }

    #[test]
    fn capture_skips_hit_testing() {
        let mut tree = Tree::new();
        let root = tree.insert(None, ElementFlags::default());
        let a = tree.insert(Some(root), ElementFlags::default());
        laid_out(&mut tree, root, Size::new(10.0, 10.0));
        let router = Router::with_parent(&tree).with_capture(Some(root));
        let out = route_point(&router, &tree, root, Point::new(1.0, 1.0));
        assert_eq!(out, [Dispatch::target(root)]);
        let free = Router::with_parent(&tree);
        assert_eq!(route_point(&free, &tree, root, Point::new(1.0, 1.0))[0].node, a);
        assert!(route_point(&free, &tree, root, Point::new(50.0, 1.0)).is_empty());
    }
}
