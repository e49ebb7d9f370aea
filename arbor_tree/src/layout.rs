// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Measure/arrange contract and invalidation.
//!
//! ## Contract
//!
//! - [`Tree::measure`] returns the cached desired size when the element is clean and
//!   the available size is unchanged. Otherwise it asks the [`LayoutDelegate`] and
//!   sanitizes the answer: the result never has a NaN or negative component.
//! - [`Tree::arrange`] records bounds relative to the parent and derives world bounds
//!   top-down, then lets the delegate place children.
//! - [`Tree::invalidate_measure`] marks the element and walks up, stopping at the first
//!   ancestor that is already measure-dirty. The cost is bounded by the distance to that
//!   ancestor rather than by the tree size.
//!
//! An unconstrained dimension is `f64::INFINITY`; [`Size::ZERO`] means no space.
//! Zero available space is valid input and yields a valid (possibly zero) desired size.

use kurbo::{Point, Rect, Size};

use crate::tree::Tree;
use crate::types::{DirtyFlags, ElementFlags, ElementId};

/// Contract violations reported by the layout entry points.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// The element id is stale.
    #[error("element {0:?} is not alive")]
    StaleElement(ElementId),
    /// The available size has a NaN or negative component.
    #[error("available size {0:?} has a NaN or negative component")]
    InvalidAvailableSize(Size),
    /// The final rect is not finite or has a negative extent.
    #[error("final rect {0:?} is not finite or has a negative extent")]
    InvalidFinalRect(Rect),
}

/// Element-specific measure and arrange logic.
///
/// Implementations recurse into children through [`Tree::measure`] and
/// [`Tree::arrange`], passing themselves along as the delegate.
pub trait LayoutDelegate {
    /// Compute the desired size of `id` given `available` space.
    fn measure(&mut self, tree: &mut Tree, id: ElementId, available: Size) -> Size;

    /// Place the children of `id` inside `final_size`.
    ///
    /// Child rects are relative to the element's own arranged origin.
    fn arrange(&mut self, tree: &mut Tree, id: ElementId, final_size: Size);
}

/// Stock delegate: children overlap and fill the parent.
#[derive(Clone, Copy, Debug, Default)]
pub struct OverlayLayout;

impl LayoutDelegate for OverlayLayout {
    fn measure(&mut self, tree: &mut Tree, id: ElementId, available: Size) -> Size {
        overlay_measure(tree, id, available, self)
    }

    fn arrange(&mut self, tree: &mut Tree, id: ElementId, final_size: Size) {
        overlay_arrange(tree, id, final_size, self);
    }
}

/// Measure every child with the full available size and return the per-axis maximum.
pub fn overlay_measure<D: LayoutDelegate + ?Sized>(
    tree: &mut Tree,
    id: ElementId,
    available: Size,
    delegate: &mut D,
) -> Size {
    let children = tree.children(id).to_vec();
    let mut desired = Size::ZERO;
    for child in children {
        if let Ok(size) = tree.measure(child, available, delegate) {
            desired.width = desired.width.max(size.width);
            desired.height = desired.height.max(size.height);
        }
    }
    desired
}

/// Arrange every child to fill `final_size`.
pub fn overlay_arrange<D: LayoutDelegate + ?Sized>(
    tree: &mut Tree,
    id: ElementId,
    final_size: Size,
    delegate: &mut D,
) {
    let children = tree.children(id).to_vec();
    let rect = Rect::from_origin_size(Point::ZERO, final_size);
    for child in children {
        // Children come from the live child list, so they cannot be stale.
        let _ = tree.arrange(child, rect, delegate);
    }
}

fn is_valid_available(size: Size) -> bool {
    !size.width.is_nan() && !size.height.is_nan() && size.width >= 0.0 && size.height >= 0.0
}

fn is_valid_final(rect: Rect) -> bool {
    rect.x0.is_finite()
        && rect.y0.is_finite()
        && rect.x1.is_finite()
        && rect.y1.is_finite()
        && rect.width() >= 0.0
        && rect.height() >= 0.0
}

fn sanitize_extent(desired: f64, available: f64) -> f64 {
    if desired.is_nan() || desired <= 0.0 {
        0.0
    } else if desired.is_infinite() {
        if available.is_finite() { available } else { 0.0 }
    } else {
        desired
    }
}

impl Tree {
    /// Measure `id` against `available` space.
    ///
    /// Hidden elements measure to [`Size::ZERO`] without consulting the delegate.
    pub fn measure<D: LayoutDelegate + ?Sized>(
        &mut self,
        id: ElementId,
        available: Size,
        delegate: &mut D,
    ) -> Result<Size, LayoutError> {
        let Some(node) = self.node_opt(id) else {
            return Err(LayoutError::StaleElement(id));
        };
        if !is_valid_available(available) {
            return Err(LayoutError::InvalidAvailableSize(available));
        }
        if !node.dirty.contains(DirtyFlags::MEASURE) && node.last_available == Some(available) {
            return Ok(node.desired_size);
        }

        let raw = if node.flags.contains(ElementFlags::VISIBLE) {
            delegate.measure(self, id, available)
        } else {
            Size::ZERO
        };
        let desired = Size::new(
            sanitize_extent(raw.width, available.width),
            sanitize_extent(raw.height, available.height),
        );

        if let Some(node) = self.node_opt_mut(id) {
            if node.desired_size != desired {
                node.dirty.insert(DirtyFlags::ARRANGE);
            }
            node.desired_size = desired;
            node.last_available = Some(available);
            node.dirty.remove(DirtyFlags::MEASURE);
        }
        Ok(desired)
    }

    /// Arrange `id` into `final_rect`, given relative to the parent's arranged origin.
    ///
    /// An element that is still measure-dirty is measured first, against its previous
    /// available size or, if it was never measured, against the final size.
    pub fn arrange<D: LayoutDelegate + ?Sized>(
        &mut self,
        id: ElementId,
        final_rect: Rect,
        delegate: &mut D,
    ) -> Result<(), LayoutError> {
        let Some(node) = self.node_opt(id) else {
            return Err(LayoutError::StaleElement(id));
        };
        if !is_valid_final(final_rect) {
            return Err(LayoutError::InvalidFinalRect(final_rect));
        }
        let parent_origin = node
            .parent
            .and_then(|p| self.node_opt(p))
            .map(|p| p.world_bounds.origin())
            .unwrap_or(Point::ZERO);
        let world = final_rect + parent_origin.to_vec2();
        if !node.dirty.intersects(DirtyFlags::MEASURE | DirtyFlags::ARRANGE)
            && node.last_final == Some(final_rect)
            && node.world_bounds == world
        {
            return Ok(());
        }

        if node.dirty.contains(DirtyFlags::MEASURE) {
            let available = node.last_available.unwrap_or(final_rect.size());
            self.measure(id, available, delegate)?;
        }

        let visible = {
            let node = self.node_opt_mut(id).ok_or(LayoutError::StaleElement(id))?;
            node.bounds = final_rect;
            node.world_bounds = world;
            node.last_final = Some(final_rect);
            node.flags.contains(ElementFlags::VISIBLE)
        };
        if visible {
            delegate.arrange(self, id, final_rect.size());
        }
        if let Some(node) = self.node_opt_mut(id) {
            node.dirty.remove(DirtyFlags::ARRANGE);
        }
        Ok(())
    }

    /// Mark `id` measure-dirty and propagate to ancestors until one is already measure-dirty.
    ///
    /// Returns how many elements went from clean to measure-dirty.
    pub fn invalidate_measure(&mut self, id: ElementId) -> usize {
        self.invalidate_upward(
            id,
            DirtyFlags::MEASURE | DirtyFlags::ARRANGE,
            DirtyFlags::MEASURE,
        )
    }

    /// Mark `id` arrange-dirty and propagate to ancestors until one is already arrange-dirty.
    ///
    /// Returns how many elements went from clean to arrange-dirty.
    pub fn invalidate_arrange(&mut self, id: ElementId) -> usize {
        self.invalidate_upward(id, DirtyFlags::ARRANGE, DirtyFlags::ARRANGE)
    }

    /// Mark `id` for repaint. Returns true if it was not already marked.
    pub fn invalidate_visual(&mut self, id: ElementId) -> bool {
        let Some(node) = self.node_opt_mut(id) else {
            return false;
        };
        let newly = !node.dirty.contains(DirtyFlags::VISUAL);
        node.dirty.insert(DirtyFlags::VISUAL);
        newly
    }

    fn invalidate_upward(&mut self, id: ElementId, mark: DirtyFlags, stop_on: DirtyFlags) -> usize {
        let Some(node) = self.node_opt_mut(id) else {
            return 0;
        };
        let mut count = usize::from(!node.dirty.contains(stop_on));
        node.dirty.insert(mark);
        let mut cur = node.parent;
        while let Some(p) = cur {
            let Some(parent) = self.node_opt_mut(p) else {
                break;
            };
            if parent.dirty.contains(stop_on) {
                break;
            }
            parent.dirty.insert(mark);
            count += 1;
            cur = parent.parent;
        }
        count
    }

    /// Pending layout and render work of a live element.
    pub fn dirty(&self, id: ElementId) -> Option<DirtyFlags> {
        self.node_opt(id).map(|n| n.dirty)
    }

    /// Returns true if `id` still needs a measure or arrange pass.
    pub fn needs_layout(&self, id: ElementId) -> bool {
        self.node_opt(id)
            .is_some_and(|n| n.dirty.intersects(DirtyFlags::MEASURE | DirtyFlags::ARRANGE))
    }

    /// Clear the repaint mark after the element has been rendered.
    pub fn clear_visual(&mut self, id: ElementId) {
        if let Some(node) = self.node_opt_mut(id) {
            node.dirty.remove(DirtyFlags::VISUAL);
        }
    }

    /// Desired size recorded by the last measure.
    pub fn desired_size(&self, id: ElementId) -> Option<Size> {
        self.node_opt(id).map(|n| n.desired_size)
    }

    /// Bounds recorded by the last arrange, relative to the parent.
    pub fn bounds(&self, id: ElementId) -> Option<Rect> {
        self.node_opt(id).map(|n| n.bounds)
    }

    /// Bounds recorded by the last arrange, in window coordinates.
    pub fn world_bounds(&self, id: ElementId) -> Option<Rect> {
        self.node_opt(id).map(|n| n.world_bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    /// Leaf sizes are fixed; containers overlay. Counts delegate calls.
    #[derive(Default)]
    struct Counting {
        leaf: Size,
        measured: Vec<ElementId>,
        arranged: Vec<ElementId>,
    }

    impl LayoutDelegate for Counting {
        fn measure(&mut self, tree: &mut Tree, id: ElementId, available: Size) -> Size {
            self.measured.push(id);
            if tree.children(id).is_empty() {
                self.leaf
            } else {
                overlay_measure(tree, id, available, self)
            }
        }

        fn arrange(&mut self, tree: &mut Tree, id: ElementId, final_size: Size) {
            self.arranged.push(id);
            overlay_arrange(tree, id, final_size, self);
        }
    }

    fn chain(tree: &mut Tree, len: usize) -> Vec<ElementId> {
        let mut ids = Vec::new();
        let mut parent = None;
        for _ in 0..len {
            let id = tree.insert(parent, ElementFlags::default());
            ids.push(id);
            parent = Some(id);
        }
        ids
    }

    fn clean(tree: &mut Tree, root: ElementId) {
        let mut layout = OverlayLayout;
        let size = Size::new(100.0, 100.0);
        tree.measure(root, size, &mut layout).unwrap();
        tree.arrange(root, Rect::from_origin_size(Point::ZERO, size), &mut layout)
            .unwrap();
    }

    #[test]
    fn invalidate_measure_stops_at_first_dirty_ancestor() {
        let mut tree = Tree::new();
        // root -> a3 -> a2 -> a1 -> e
        let ids = chain(&mut tree, 5);
        let (root, a3, a2, a1, e) = (ids[0], ids[1], ids[2], ids[3], ids[4]);
        clean(&mut tree, root);
        assert!(!tree.needs_layout(root));

        // Third ancestor already dirty; root stays clean behind it.
        tree.node_opt_mut(a3).unwrap().dirty.insert(DirtyFlags::MEASURE);
        let newly = tree.invalidate_measure(e);
        assert_eq!(newly, 3, "only e, parent, grandparent transition");
        for id in [e, a1, a2, a3] {
            assert!(tree.dirty(id).unwrap().contains(DirtyFlags::MEASURE));
        }
        assert!(!tree.dirty(root).unwrap().contains(DirtyFlags::MEASURE));

        // A second call finds everything already dirty.
        assert_eq!(tree.invalidate_measure(e), 0);
    }

    #[test]
    fn invalidate_measure_reaches_root_on_clean_chain() {
        let mut tree = Tree::new();
        let ids = chain(&mut tree, 4);
        clean(&mut tree, ids[0]);
        assert_eq!(tree.invalidate_measure(ids[3]), 4);
        assert!(tree.needs_layout(ids[0]));
    }

    #[test]
    fn measure_is_cached_until_invalidated() {
        let mut tree = Tree::new();
        let root = tree.insert(None, ElementFlags::default());
        let leaf = tree.insert(Some(root), ElementFlags::default());
        let mut layout = Counting {
            leaf: Size::new(30.0, 20.0),
            ..Default::default()
        };
        let available = Size::new(200.0, 200.0);

        assert_eq!(
            tree.measure(root, available, &mut layout),
            Ok(Size::new(30.0, 20.0))
        );
        assert_eq!(layout.measured, [root, leaf]);

        // Same input, clean element: cached.
        tree.measure(root, available, &mut layout).unwrap();
        assert_eq!(layout.measured.len(), 2);

        // Different available size recomputes the element itself; the clean child is reused
        // only when its own available size is unchanged.
        tree.measure(root, Size::new(300.0, 300.0), &mut layout)
            .unwrap();
        assert_eq!(layout.measured.len(), 4);

        tree.invalidate_measure(leaf);
        layout.leaf = Size::new(50.0, 10.0);
        assert_eq!(
            tree.measure(root, Size::new(300.0, 300.0), &mut layout),
            Ok(Size::new(50.0, 10.0))
        );
    }

    #[test]
    fn measure_sanitizes_results() {
        let mut tree = Tree::new();
        let root = tree.insert(None, ElementFlags::default());
        let mut layout = Counting {
            leaf: Size::new(f64::NAN, -4.0),
            ..Default::default()
        };
        assert_eq!(
            tree.measure(root, Size::new(10.0, 10.0), &mut layout),
            Ok(Size::ZERO)
        );

        tree.invalidate_measure(root);
        layout.leaf = Size::new(f64::INFINITY, f64::INFINITY);
        assert_eq!(
            tree.measure(root, Size::new(10.0, f64::INFINITY), &mut layout),
            Ok(Size::new(10.0, 0.0))
        );
    }

    #[test]
    fn zero_and_unconstrained_space_are_valid() {
        let mut tree = Tree::new();
        let root = tree.insert(None, ElementFlags::default());
        let mut layout = Counting {
            leaf: Size::new(12.0, 8.0),
            ..Default::default()
        };
        assert_eq!(tree.measure(root, Size::ZERO, &mut layout), Ok(Size::new(12.0, 8.0)));
        tree.invalidate_measure(root);
        assert_eq!(
            tree.measure(root, Size::new(f64::INFINITY, f64::INFINITY), &mut layout),
            Ok(Size::new(12.0, 8.0))
        );
    }

    #[test]
    fn contract_violations_are_errors() {
        let mut tree = Tree::new();
        let root = tree.insert(None, ElementFlags::default());
        let mut layout = OverlayLayout;
        assert_eq!(
            tree.measure(root, Size::new(-1.0, 0.0), &mut layout),
            Err(LayoutError::InvalidAvailableSize(Size::new(-1.0, 0.0)))
        );
        assert!(matches!(
            tree.measure(root, Size::new(f64::NAN, 0.0), &mut layout),
            Err(LayoutError::InvalidAvailableSize(_))
        ));
        let bad = Rect::new(0.0, 0.0, f64::INFINITY, 1.0);
        assert_eq!(
            tree.arrange(root, bad, &mut layout),
            Err(LayoutError::InvalidFinalRect(bad))
        );
        tree.remove(root);
        assert_eq!(
            tree.measure(root, Size::ZERO, &mut layout),
            Err(LayoutError::StaleElement(root))
        );
    }

    #[test]
    fn arrange_is_skipped_when_clean_and_unchanged() {
        let mut tree = Tree::new();
        let root = tree.insert(None, ElementFlags::default());
        let child = tree.insert(Some(root), ElementFlags::default());
        let mut layout = Counting::default();
        let rect = Rect::new(0.0, 0.0, 80.0, 60.0);
        tree.measure(root, rect.size(), &mut layout).unwrap();
        tree.arrange(root, rect, &mut layout).unwrap();
        assert_eq!(layout.arranged, [root, child]);

        tree.arrange(root, rect, &mut layout).unwrap();
        assert_eq!(layout.arranged.len(), 2);

        // Moving the root re-arranges it and shifts the child's world bounds.
        let moved = rect + kurbo::Vec2::new(10.0, 5.0);
        tree.arrange(root, moved, &mut layout).unwrap();
        assert_eq!(layout.arranged.len(), 4);
        assert_eq!(tree.bounds(child), Some(Rect::new(0.0, 0.0, 80.0, 60.0)));
        assert_eq!(tree.world_bounds(child), Some(Rect::new(10.0, 5.0, 90.0, 65.0)));
        assert!(!tree.needs_layout(root));
    }

    #[test]
    fn visual_invalidation_is_independent_of_layout() {
        let mut tree = Tree::new();
        let root = tree.insert(None, ElementFlags::default());
        clean(&mut tree, root);
        tree.clear_visual(root);
        assert!(tree.invalidate_visual(root));
        assert!(!tree.invalidate_visual(root));
        assert!(!tree.needs_layout(root));
        tree.clear_visual(root);
        assert_eq!(tree.dirty(root), Some(DirtyFlags::empty()));
    }

    #[test]
    fn structural_changes_invalidate_parent_measure() {
        let mut tree = Tree::new();
        let root = tree.insert(None, ElementFlags::default());
        clean(&mut tree, root);
        let child = tree.insert(Some(root), ElementFlags::default());
        assert!(tree.needs_layout(root));
        clean(&mut tree, root);
        tree.remove(child);
        assert!(tree.needs_layout(root));
    }
}
