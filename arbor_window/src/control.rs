// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Controls: the per-element behavior attached to tree elements.
//!
//! A [`Control`] is owned by its [`Window`]. While one of its methods runs, the control is
//! taken out of the window's table so the method can receive `&mut Window` through its
//! context. Notifications aimed at a control in that state are queued and delivered as
//! soon as it is put back.

use std::collections::HashMap;

use arbor_responder::text_input::SuppressibleKey;
use arbor_responder::types::Phase;
use arbor_tree::{
    ElementId, ElementState, LayoutDelegate, Tree, overlay_arrange, overlay_measure,
};
use kurbo::{Point, Rect, Size};

use crate::backend::GraphicsContext;
use crate::event::{KeyEvent, MouseButtonEvent, MouseEvent, WheelEvent};
use crate::window::Window;

/// Behavior of one element. Every method has a default.
#[expect(unused_variables, reason = "default bodies ignore their arguments")]
pub trait Control {
    /// Desired size. Defaults to overlaying children.
    fn measure(&mut self, cx: &mut LayoutCx<'_>, available: Size) -> Size {
        cx.measure_children(available)
    }

    /// Place children. Defaults to stretching every child over `final_size`.
    fn arrange(&mut self, cx: &mut LayoutCx<'_>, final_size: Size) {
        cx.arrange_children(final_size);
    }

    /// Draw in local coordinates; the origin is the element's top-left corner.
    fn render(&mut self, cx: &mut RenderCx<'_>, gfx: &mut dyn GraphicsContext) {}

    /// Pointer moved over (or, while captured, anywhere).
    fn mouse_move(&mut self, cx: &mut EventCx<'_>, event: &MouseEvent) {}
    /// Button pressed.
    fn mouse_down(&mut self, cx: &mut EventCx<'_>, event: &MouseButtonEvent) {}
    /// Second pass for a double click, after [`mouse_down`](Self::mouse_down).
    fn double_click(&mut self, cx: &mut EventCx<'_>, event: &MouseButtonEvent) {}
    /// Button released.
    fn mouse_up(&mut self, cx: &mut EventCx<'_>, event: &MouseButtonEvent) {}
    /// Wheel scrolled.
    fn mouse_wheel(&mut self, cx: &mut EventCx<'_>, event: &WheelEvent) {}
    /// Key pressed while this element or a descendant has focus.
    fn key_down(&mut self, cx: &mut EventCx<'_>, event: &KeyEvent) {}
    /// Key released while this element or a descendant has focus.
    fn key_up(&mut self, cx: &mut EventCx<'_>, event: &KeyEvent) {}
    /// Committed text while this element or a descendant has focus.
    fn text_input(&mut self, cx: &mut EventCx<'_>, text: &str) {}

    /// This element gained or lost focus.
    fn focus_changed(&mut self, focused: bool) {}
    /// This element joined or left the focused chain.
    fn focus_within_changed(&mut self, within: bool) {}
    /// Pointer entered this element or a descendant.
    fn pointer_entered(&mut self) {}
    /// Pointer left this element and its descendants.
    fn pointer_exited(&mut self) {}
    /// The element was removed or its window closed. Release backend resources here.
    fn detached(&mut self) {}

    /// Element that should receive focus in place of this one.
    fn default_focus_target(&self) -> Option<ElementId> {
        None
    }

    /// Scrolls focused descendants into view.
    fn as_focus_into_view_host(&mut self) -> Option<&mut dyn FocusIntoViewHost> {
        None
    }

    /// Handles tab navigation past the realized end of virtualized content.
    fn as_virtualized_tab_host(&mut self) -> Option<&mut dyn VirtualizedTabHost> {
        None
    }

    /// Restricts tab order to one selected content element.
    fn as_selected_content_host(&self) -> Option<&dyn SelectedContentHost> {
        None
    }
}

/// Ancestor that brings a newly focused descendant into view.
pub trait FocusIntoViewHost {
    /// `element` was focused. Returns true if the host acted on it.
    fn on_descendant_focused(&mut self, cx: &mut EventCx<'_>, element: ElementId) -> bool;
}

/// Ancestor whose content is only partially realized.
pub trait VirtualizedTabHost {
    /// Tab navigation would wrap past `from`. Return true after moving focus internally.
    fn try_move_focus_from_descendant(
        &mut self,
        cx: &mut EventCx<'_>,
        from: ElementId,
        forward: bool,
    ) -> bool;
}

/// Container showing one of several content elements (tab control, pager).
pub trait SelectedContentHost {
    /// The content element currently shown.
    fn selected_content(&self) -> Option<ElementId>;
}

/// Context for [`Control::measure`] and [`Control::arrange`].
pub struct LayoutCx<'a> {
    pub(crate) tree: &'a mut Tree,
    pub(crate) id: ElementId,
    pub(crate) delegate: &'a mut dyn LayoutDelegate,
}

impl core::fmt::Debug for LayoutCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LayoutCx")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl LayoutCx<'_> {
    /// Element being laid out.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Read-only view of the tree.
    pub fn tree(&self) -> &Tree {
        self.tree
    }

    /// Children of the element, in order.
    pub fn children(&self) -> Vec<ElementId> {
        self.tree.children(self.id).to_vec()
    }

    /// Measure a child. Stale children measure to zero.
    pub fn measure_child(&mut self, child: ElementId, available: Size) -> Size {
        self.tree
            .measure(child, available, self.delegate)
            .unwrap_or(Size::ZERO)
    }

    /// Arrange a child at `rect`, relative to this element.
    pub fn arrange_child(&mut self, child: ElementId, rect: Rect) {
        if let Err(err) = self.tree.arrange(child, rect, self.delegate) {
            log::warn!("arranging {child:?} under {:?} failed: {err}", self.id);
        }
    }

    /// Overlay measure of all children.
    pub fn measure_children(&mut self, available: Size) -> Size {
        overlay_measure(self.tree, self.id, available, self.delegate)
    }

    /// Stretch all children over `final_size`.
    pub fn arrange_children(&mut self, final_size: Size) {
        overlay_arrange(self.tree, self.id, final_size, self.delegate);
    }
}

/// Context for [`Control::render`].
#[derive(Debug)]
pub struct RenderCx<'a> {
    pub(crate) tree: &'a Tree,
    pub(crate) id: ElementId,
}

impl RenderCx<'_> {
    /// Element being drawn.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Arranged size.
    pub fn size(&self) -> Size {
        self.tree.bounds(self.id).map(|b| b.size()).unwrap_or_default()
    }

    /// Interaction state, for focus and hover styling.
    pub fn state(&self) -> ElementState {
        self.tree.state(self.id).unwrap_or_default()
    }

    /// Returns false if the element or an ancestor is disabled.
    pub fn is_enabled(&self) -> bool {
        self.tree.is_effectively_enabled(self.id)
    }
}

/// Context for input handlers and host capabilities.
pub struct EventCx<'a> {
    window: &'a mut Window,
    id: ElementId,
    target: ElementId,
    phase: Phase,
    handled: bool,
}

impl core::fmt::Debug for EventCx<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventCx")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("phase", &self.phase)
            .field("handled", &self.handled)
            .finish_non_exhaustive()
    }
}

impl<'a> EventCx<'a> {
    pub(crate) fn new(
        window: &'a mut Window,
        id: ElementId,
        target: ElementId,
        phase: Phase,
    ) -> Self {
        Self {
            window,
            id,
            target,
            phase,
            handled: false,
        }
    }

    /// Element whose handler is running.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Element the event was routed to.
    pub fn target(&self) -> ElementId {
        self.target
    }

    /// Whether this is the target step or a bubble step.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Stop the event here.
    pub fn set_handled(&mut self) {
        self.handled = true;
    }

    /// Returns true once a handler called [`set_handled`](Self::set_handled).
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// The window, for anything the shortcuts below do not cover.
    pub fn window(&mut self) -> &mut Window {
        self.window
    }

    /// Arranged bounds of this element, in window coordinates.
    pub fn bounds(&self) -> Rect {
        self.window
            .tree()
            .world_bounds(self.id)
            .unwrap_or(Rect::ZERO)
    }

    /// Convert a window point into this element's coordinates.
    pub fn to_local(&self, point: Point) -> Point {
        point - self.bounds().origin().to_vec2()
    }

    /// Focus `element`. See [`Window::set_focus`].
    pub fn focus(&mut self, element: ElementId) -> bool {
        self.window.focus(element)
    }

    /// Focus this element.
    pub fn request_focus(&mut self) -> bool {
        self.window.focus(self.id)
    }

    /// Capture the mouse for this element.
    pub fn capture_mouse(&mut self) -> bool {
        self.window.capture_mouse(self.id)
    }

    /// Release mouse capture.
    pub fn release_mouse_capture(&mut self) {
        self.window.release_mouse_capture();
    }

    /// Schedule a repaint of this element.
    pub fn invalidate_visual(&mut self) {
        self.window.invalidate_visual(self.id);
    }

    /// Schedule a re-measure of this element.
    pub fn invalidate_measure(&mut self) {
        self.window.invalidate_measure(self.id);
    }

    /// Mark the event handled and drop the committed text the platform will send for
    /// `key`.
    pub fn handle_and_suppress_text(&mut self, key: SuppressibleKey) {
        self.handled = true;
        self.window.suppress_next_text(key);
    }
}

/// Notification delivered to a control outside of event routing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Notification {
    FocusChanged(bool),
    FocusWithinChanged(bool),
    PointerEntered,
    PointerExited,
    Detached,
}

impl Notification {
    fn deliver(self, control: &mut dyn Control) {
        match self {
            Self::FocusChanged(on) => control.focus_changed(on),
            Self::FocusWithinChanged(on) => control.focus_within_changed(on),
            Self::PointerEntered => control.pointer_entered(),
            Self::PointerExited => control.pointer_exited(),
            Self::Detached => control.detached(),
        }
    }
}

enum Slot {
    Present(Box<dyn Control>),
    Taken,
    Removed,
}

/// Controls by element, with take-out/put-back and deferred notifications.
#[derive(Default)]
pub(crate) struct ControlTable {
    slots: HashMap<ElementId, Slot>,
    deferred: Vec<(ElementId, Notification)>,
}

impl ControlTable {
    pub(crate) fn insert(&mut self, id: ElementId, control: Box<dyn Control>) {
        self.slots.insert(id, Slot::Present(control));
    }

    pub(crate) fn get(&self, id: ElementId) -> Option<&dyn Control> {
        match self.slots.get(&id) {
            Some(Slot::Present(c)) => Some(c.as_ref()),
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, id: ElementId) -> Option<&mut (dyn Control + 'static)> {
        match self.slots.get_mut(&id) {
            Some(Slot::Present(c)) => Some(c.as_mut()),
            _ => None,
        }
    }

    pub(crate) fn take(&mut self, id: ElementId) -> Option<Box<dyn Control>> {
        let slot = self.slots.get_mut(&id)?;
        match core::mem::replace(slot, Slot::Taken) {
            Slot::Present(c) => Some(c),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Put a taken control back and flush what queued up for it meanwhile.
    pub(crate) fn restore(&mut self, id: ElementId, mut control: Box<dyn Control>) {
        let mut pending = Vec::new();
        self.deferred.retain(|&(target, n)| {
            if target == id {
                pending.push(n);
                false
            } else {
                true
            }
        });
        for n in pending {
            n.deliver(control.as_mut());
        }
        match self.slots.get(&id) {
            Some(Slot::Taken) => {
                self.slots.insert(id, Slot::Present(control));
            }
            Some(Slot::Removed) => {
                self.slots.remove(&id);
            }
            Some(Slot::Present(_)) | None => {
                log::warn!("restored control for {id:?} no longer has a slot");
            }
        }
    }

    /// Deliver `n` now, or once the control is restored.
    pub(crate) fn notify(&mut self, id: ElementId, n: Notification) {
        match self.slots.get_mut(&id) {
            Some(Slot::Present(c)) => n.deliver(c.as_mut()),
            Some(Slot::Taken) => {
                log::trace!("deferring {n:?} for executing control {id:?}");
                self.deferred.push((id, n));
            }
            Some(Slot::Removed) | None => {}
        }
    }

    /// Detach and drop the control of a removed element.
    pub(crate) fn remove(&mut self, id: ElementId) {
        match self.slots.remove(&id) {
            Some(Slot::Present(mut c)) => c.detached(),
            Some(Slot::Taken) => {
                self.slots.insert(id, Slot::Removed);
                self.deferred.push((id, Notification::Detached));
            }
            Some(Slot::Removed) | None => {}
        }
    }

    pub(crate) fn ids(&self) -> Vec<ElementId> {
        self.slots.keys().copied().collect()
    }
}

/// The tree's layout delegate: elements with a control defer to it, others overlay.
pub(crate) struct ControlLayout<'a> {
    pub(crate) controls: &'a mut ControlTable,
}

impl LayoutDelegate for ControlLayout<'_> {
    fn measure(&mut self, tree: &mut Tree, id: ElementId, available: Size) -> Size {
        let Some(mut control) = self.controls.take(id) else {
            return overlay_measure(tree, id, available, self);
        };
        let size = {
            let mut cx = LayoutCx {
                tree,
                id,
                delegate: self,
            };
            control.measure(&mut cx, available)
        };
        self.controls.restore(id, control);
        size
    }

    fn arrange(&mut self, tree: &mut Tree, id: ElementId, final_size: Size) {
        let Some(mut control) = self.controls.take(id) else {
            overlay_arrange(tree, id, final_size, self);
            return;
        };
        {
            let mut cx = LayoutCx {
                tree,
                id,
                delegate: self,
            };
            control.arrange(&mut cx, final_size);
        }
        self.controls.restore(id, control);
    }
}
