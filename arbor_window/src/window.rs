// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Windows: lifecycle, elements, popups, layout and render.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arbor_dispatch::{MergeKey, Priority};
use arbor_responder::adapters::tree::PopupAware;
use arbor_responder::focus::FocusState;
use arbor_responder::hover::{HoverEvent, HoverState};
use arbor_responder::router::Router;
use arbor_responder::text_input::{SuppressibleKey, TextInputSuppression};
use arbor_tree::{ElementFlags, ElementId, ElementState, LayoutError, Tree};
use kurbo::{Affine, Point, Rect, Size};
use log::{debug, trace};

use crate::app::{AppContext, WindowId};
use crate::backend::{GraphicsContext, NativeHandle, WindowBackend};
use crate::control::{Control, ControlLayout, ControlTable, Notification, RenderCx};
use crate::input::InputHooks;

/// Errors from window operations.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum WindowError {
    /// The window has been closed.
    #[error("the window is closed")]
    Closed,
    /// The element id is stale.
    #[error("element {0:?} is not alive")]
    StaleElement(ElementId),
    /// A popup root must be a parentless element other than the content root.
    #[error("element {0:?} is not a free root")]
    NotARoot(ElementId),
    /// The popup is already open.
    #[error("popup {0:?} is already open")]
    AlreadyOpen(ElementId),
    /// The content root cannot be removed.
    #[error("the content root cannot be removed")]
    ContentRoot,
    /// Layout contract violation.
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Lifecycle of a window.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WindowState {
    /// Constructed; no native window yet.
    Created,
    /// Visible on screen.
    Shown,
    /// Native window exists but is hidden.
    Hidden,
    /// Backend resources released; the window is inert.
    Closed,
}

/// Window creation options.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WindowOptions {
    /// Title bar text.
    pub title: String,
    /// Client size requested at first show; the backend default if `None`.
    pub initial_size: Option<Size>,
}

/// Options for [`Window::open_popup`].
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PopupOptions {
    /// Element that opened the popup. Unhandled input inside the popup bubbles to it.
    pub owner: Option<ElementId>,
    /// Window-relative top-left corner.
    pub position: Point,
    /// Keep the popup open when focus moves outside it.
    pub stays_open: bool,
    /// Close the popup when the mouse goes down outside it.
    pub light_dismiss: bool,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct Popup {
    pub(crate) root: ElementId,
    pub(crate) options: PopupOptions,
}

pub(crate) fn owner_in(popups: &[Popup], root: ElementId) -> Option<ElementId> {
    popups
        .iter()
        .find(|p| p.root == root)
        .and_then(|p| p.options.owner)
}

/// A top-level window: element tree, controls, focus, capture, popups, and backend.
///
/// All methods must be called on the UI thread.
pub struct Window {
    pub(crate) id: WindowId,
    pub(crate) app: AppContext,
    pub(crate) backend: Arc<dyn WindowBackend>,
    pub(crate) options: WindowOptions,
    pub(crate) state: WindowState,
    pub(crate) native: Option<NativeHandle>,
    pub(crate) tree: Tree,
    pub(crate) content: ElementId,
    pub(crate) controls: ControlTable,
    pub(crate) popups: Vec<Popup>,
    pub(crate) focus: FocusState<ElementId>,
    pub(crate) hover: HoverState<ElementId>,
    pub(crate) capture: Option<ElementId>,
    pub(crate) suppression: TextInputSuppression,
    pub(crate) hooks: InputHooks,
    pub(crate) render_pending: Arc<AtomicBool>,
}

impl core::fmt::Debug for Window {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("native", &self.native)
            .field("focused", &self.focus.focused())
            .field("capture", &self.capture)
            .field("popups", &self.popups)
            .finish_non_exhaustive()
    }
}

impl Window {
    /// An inert window with an empty content root.
    pub fn new(app: &AppContext, backend: Arc<dyn WindowBackend>, options: WindowOptions) -> Self {
        let mut tree = Tree::new();
        let content = tree.insert(None, ElementFlags::default());
        Self {
            id: app.allocate_window_id(),
            app: app.clone(),
            backend,
            options,
            state: WindowState::Created,
            native: None,
            tree,
            content,
            controls: ControlTable::default(),
            popups: Vec::new(),
            focus: FocusState::new(),
            hover: HoverState::new(),
            capture: None,
            suppression: TextInputSuppression::default(),
            hooks: InputHooks::default(),
            render_pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Window identifier.
    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Lifecycle state.
    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Native handle; `None` until first shown and after close.
    pub fn native_handle(&self) -> Option<NativeHandle> {
        self.native
    }

    /// The application context.
    pub fn app(&self) -> &AppContext {
        &self.app
    }

    /// The platform backend.
    pub fn backend(&self) -> &Arc<dyn WindowBackend> {
        &self.backend
    }

    /// Read-only view of the element tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Root of the window content.
    pub fn content_root(&self) -> ElementId {
        self.content
    }

    fn ensure_open(&self) -> Result<(), WindowError> {
        if self.state == WindowState::Closed {
            Err(WindowError::Closed)
        } else {
            Ok(())
        }
    }

    fn ensure_alive(&self, id: ElementId) -> Result<(), WindowError> {
        self.ensure_open()?;
        if self.tree.is_alive(id) {
            Ok(())
        } else {
            Err(WindowError::StaleElement(id))
        }
    }

    /// Allocate the native window, register with the application, lay out, and request
    /// the first render.
    pub fn show(&mut self) -> Result<NativeHandle, WindowError> {
        self.ensure_open()?;
        let handle = self.backend.show(&self.options);
        self.native = Some(handle);
        self.state = WindowState::Shown;
        self.app.register_window(self.id);
        debug!("window {:?} shown as {handle:?}", self.id);
        self.update_layout()?;
        self.request_render();
        Ok(handle)
    }

    /// Hide the window, dropping capture and mouse-over.
    pub fn hide(&mut self) -> Result<(), WindowError> {
        self.ensure_open()?;
        if self.state != WindowState::Shown {
            return Ok(());
        }
        self.release_mouse_capture();
        self.update_mouse_over(None);
        self.backend.hide();
        self.state = WindowState::Hidden;
        debug!("window {:?} hidden", self.id);
        Ok(())
    }

    /// Release backend resources, detach every control, and unregister. Idempotent.
    pub fn close(&mut self) {
        if self.state == WindowState::Closed {
            return;
        }
        // Teardown below must not queue render or requery work.
        self.state = WindowState::Closed;
        self.release_mouse_capture();
        self.update_mouse_over(None);
        self.apply_focus(None);
        self.popups.clear();
        for id in self.controls.ids() {
            self.controls.remove(id);
        }
        if self.native.take().is_some() {
            self.backend.close();
        }
        self.render_pending.store(false, Ordering::Release);
        self.app.unregister_window(self.id);
        debug!("window {:?} closed", self.id);
    }

    /// Change the title.
    pub fn set_title(&mut self, title: &str) -> Result<(), WindowError> {
        self.ensure_open()?;
        title.clone_into(&mut self.options.title);
        if self.native.is_some() {
            self.backend.set_title(title);
        }
        Ok(())
    }

    /// Insert an element under `parent` (or as a free root for popups) with an optional
    /// control.
    pub fn insert(
        &mut self,
        parent: Option<ElementId>,
        flags: ElementFlags,
        control: Option<Box<dyn Control>>,
    ) -> Result<ElementId, WindowError> {
        self.ensure_open()?;
        if let Some(p) = parent {
            self.ensure_alive(p)?;
        }
        let id = self.tree.insert(parent, flags);
        if let Some(control) = control {
            self.controls.insert(id, control);
        }
        self.request_render();
        Ok(id)
    }

    /// Insert a child element driven by `control`.
    pub fn add_child(
        &mut self,
        parent: ElementId,
        flags: ElementFlags,
        control: impl Control + 'static,
    ) -> Result<ElementId, WindowError> {
        self.insert(Some(parent), flags, Some(Box::new(control)))
    }

    /// Attach or replace the control of `id`. A replaced control is detached.
    pub fn set_control(
        &mut self,
        id: ElementId,
        control: Box<dyn Control>,
    ) -> Result<(), WindowError> {
        self.ensure_alive(id)?;
        self.controls.remove(id);
        self.controls.insert(id, control);
        self.tree.invalidate_measure(id);
        self.request_render();
        Ok(())
    }

    /// The control of `id`, unless it is currently running.
    pub fn control(&self, id: ElementId) -> Option<&dyn Control> {
        self.controls.get(id)
    }

    /// Mutable access to the control of `id`, unless it is currently running.
    pub fn control_mut(&mut self, id: ElementId) -> Option<&mut (dyn Control + 'static)> {
        self.controls.get_mut(id)
    }

    /// Remove `id` and its subtree. Returns the removed ids in pre-order.
    ///
    /// Focus, capture, and mouse-over are moved off the subtree first, popups it owns or
    /// contains are closed, and every removed control is detached.
    pub fn remove_element(&mut self, id: ElementId) -> Result<Vec<ElementId>, WindowError> {
        self.ensure_alive(id)?;
        if id == self.content {
            return Err(WindowError::ContentRoot);
        }
        let doomed: Vec<ElementId> = arbor_tree::traverse::find_all(&self.tree, id, |_| true);
        let affected: Vec<ElementId> = self
            .popups
            .iter()
            .filter(|p| {
                doomed.contains(&p.root) || p.options.owner.is_some_and(|o| doomed.contains(&o))
            })
            .map(|p| p.root)
            .collect();
        for root in affected {
            self.close_popup(root);
        }
        if self.focus.chain().iter().any(|k| doomed.contains(k)) {
            self.apply_focus(None);
        }
        if self.capture.is_some_and(|c| doomed.contains(&c)) {
            self.release_mouse_capture();
        }
        if let Some(i) = self
            .hover
            .current_path()
            .iter()
            .position(|k| doomed.contains(k))
        {
            let keep = self.hover.current_path()[..i].to_vec();
            self.apply_hover(&keep);
        }
        let removed = self.tree.remove(id);
        for &r in &removed {
            self.controls.remove(r);
        }
        debug!("removed {} elements under {id:?}", removed.len());
        self.request_render();
        Ok(removed)
    }

    /// Enable or disable `id` and its subtree.
    pub fn set_enabled(&mut self, id: ElementId, enabled: bool) -> Result<(), WindowError> {
        self.ensure_alive(id)?;
        self.tree.set_enabled(id, enabled);
        self.tree.invalidate_visual(id);
        self.revalidate();
        self.request_render();
        Ok(())
    }

    /// Show or hide `id` and its subtree.
    pub fn set_visible(&mut self, id: ElementId, visible: bool) -> Result<(), WindowError> {
        self.ensure_alive(id)?;
        self.tree.set_visible(id, visible);
        self.revalidate();
        self.request_render();
        Ok(())
    }

    /// Change whether `id` can take focus.
    pub fn set_focusable(&mut self, id: ElementId, focusable: bool) -> Result<(), WindowError> {
        self.ensure_alive(id)?;
        self.tree.set_focusable(id, focusable);
        self.revalidate();
        Ok(())
    }

    /// Returns true if `id` is alive under the content root or an open popup.
    pub(crate) fn is_attached(&self, id: ElementId) -> bool {
        if !self.tree.is_alive(id) {
            return false;
        }
        let root = self.tree.root_of(id);
        root == self.content || self.popups.iter().any(|p| p.root == root)
    }

    /// Re-check the focused and captured elements after an eligibility change.
    fn revalidate(&mut self) {
        if let Some(f) = self.focus.focused()
            && !self.can_focus(f)
        {
            debug!("focused {f:?} is no longer eligible; clearing focus");
            self.apply_focus(None);
        }
        if let Some(c) = self.capture
            && !self.can_capture(c)
        {
            debug!("captured {c:?} is no longer enabled and visible; releasing");
            self.release_mouse_capture();
        }
    }

    /// Open `root` as a popup on top of the content and any earlier popups.
    pub fn open_popup(
        &mut self,
        root: ElementId,
        options: PopupOptions,
    ) -> Result<(), WindowError> {
        self.ensure_alive(root)?;
        if root == self.content || self.tree.parent(root).is_some() {
            return Err(WindowError::NotARoot(root));
        }
        if self.popups.iter().any(|p| p.root == root) {
            return Err(WindowError::AlreadyOpen(root));
        }
        if let Some(owner) = options.owner {
            self.ensure_alive(owner)?;
        }
        self.popups.push(Popup { root, options });
        self.tree.invalidate_measure(root);
        debug!("opened popup {root:?} owned by {:?}", options.owner);
        self.request_render();
        Ok(())
    }

    /// Close an open popup. Returns false if it was not open.
    ///
    /// Focus inside the popup moves to its owner (or is cleared), capture inside it is
    /// released, and the pointer leaves it.
    pub fn close_popup(&mut self, root: ElementId) -> bool {
        let Some(i) = self.popups.iter().position(|p| p.root == root) else {
            return false;
        };
        let popup = self.popups.remove(i);
        if let Some(c) = self.capture
            && self.tree.is_alive(c)
            && self.tree.root_of(c) == root
        {
            self.release_mouse_capture();
        }
        if let Some(j) = self
            .hover
            .current_path()
            .iter()
            .position(|&k| k == root)
        {
            let keep = self.hover.current_path()[..j].to_vec();
            self.apply_hover(&keep);
        }
        if self.focus.is_within(root) {
            let moved = popup.options.owner.is_some_and(|o| self.set_focus(Some(o)));
            if !moved {
                self.apply_focus(None);
            }
        }
        debug!("closed popup {root:?}");
        self.request_render();
        true
    }

    /// Open popup roots, oldest first.
    pub fn popups(&self) -> Vec<ElementId> {
        self.popups.iter().map(|p| p.root).collect()
    }

    /// Owner registered for an open popup root.
    pub fn popup_owner(&self, root: ElementId) -> Option<ElementId> {
        owner_in(&self.popups, root)
    }

    /// Options an open popup was opened with.
    pub fn popup_options(&self, root: ElementId) -> Option<PopupOptions> {
        self.popups
            .iter()
            .find(|p| p.root == root)
            .map(|p| p.options)
    }

    /// Router over popup-aware bubble parents, carrying the current capture.
    pub(crate) fn router(
        &self,
    ) -> Router<ElementId, PopupAware<'_, impl Fn(ElementId) -> Option<ElementId> + '_>> {
        let popups = &self.popups;
        Router::with_parent(PopupAware::new(&self.tree, move |id| owner_in(popups, id)))
            .with_capture(self.capture)
    }

    /// Root → `id` chain through popup owners.
    pub fn chain(&self, id: ElementId) -> Vec<ElementId> {
        self.router().chain(id)
    }

    pub(crate) fn notify(&mut self, id: ElementId, n: Notification) {
        self.controls.notify(id, n);
    }

    /// Move mouse-over to `target`'s chain, notifying the difference.
    pub(crate) fn update_mouse_over(&mut self, target: Option<ElementId>) {
        let chain = target.map(|t| self.chain(t)).unwrap_or_default();
        self.apply_hover(&chain);
    }

    pub(crate) fn apply_hover(&mut self, chain: &[ElementId]) {
        for event in self.hover.update_path(chain) {
            match event {
                HoverEvent::Leave(k) => {
                    self.tree.set_state(k, ElementState::POINTER_OVER, false);
                    self.notify(k, Notification::PointerExited);
                }
                HoverEvent::Enter(k) => {
                    self.tree.set_state(k, ElementState::POINTER_OVER, true);
                    self.notify(k, Notification::PointerEntered);
                }
            }
        }
    }

    /// Element under the pointer (or captured), if any.
    pub fn mouse_over(&self) -> Option<ElementId> {
        self.hover.target()
    }

    /// Root → leaf mouse-over chain.
    pub fn mouse_over_chain(&self) -> &[ElementId] {
        self.hover.current_path()
    }

    pub(crate) fn suppress_next_text(&mut self, key: SuppressibleKey) {
        self.suppression.suppress_next_from_handled_key_down(key);
    }

    /// Mark `id` measure-dirty and schedule a render pass.
    pub fn invalidate_measure(&mut self, id: ElementId) -> usize {
        let n = self.tree.invalidate_measure(id);
        self.request_render();
        n
    }

    /// Mark `id` arrange-dirty and schedule a render pass.
    pub fn invalidate_arrange(&mut self, id: ElementId) -> usize {
        let n = self.tree.invalidate_arrange(id);
        self.request_render();
        n
    }

    /// Mark `id` for repaint and schedule a render pass.
    pub fn invalidate_visual(&mut self, id: ElementId) {
        self.tree.invalidate_visual(id);
        self.request_render();
    }

    /// Queue this window's render pass unless one is already pending.
    ///
    /// The queued action flags the pass (see [`needs_render`](Self::needs_render)) and
    /// asks the backend to repaint. Returns true if a new pass was queued.
    pub fn request_render(&self) -> bool {
        if self.state != WindowState::Shown {
            return false;
        }
        let pending = Arc::clone(&self.render_pending);
        let backend = Arc::clone(&self.backend);
        let queued = self.app.dispatcher().enqueue_merged(
            Priority::Render,
            MergeKey::render_pass(self.id.get()),
            move || {
                pending.store(true, Ordering::Release);
                backend.invalidate();
                Ok(())
            },
        );
        if queued {
            trace!("render pass queued for {:?}", self.id);
        }
        queued
    }

    /// Returns true once a queued render pass has run and [`render`](Self::render) has
    /// not been called since.
    pub fn needs_render(&self) -> bool {
        self.render_pending.load(Ordering::Acquire)
    }

    /// Measure and arrange the content at the client size and each popup at its
    /// desired size.
    pub fn update_layout(&mut self) -> Result<(), WindowError> {
        self.ensure_open()?;
        let size = self.backend.client_size();
        let Self {
            tree,
            controls,
            popups,
            content,
            ..
        } = self;
        let mut layout = ControlLayout { controls };
        tree.measure(*content, size, &mut layout)?;
        tree.arrange(*content, Rect::from_origin_size(Point::ZERO, size), &mut layout)?;
        for popup in popups.iter() {
            let unbounded = Size::new(f64::INFINITY, f64::INFINITY);
            let desired = tree.measure(popup.root, unbounded, &mut layout)?;
            tree.arrange(
                popup.root,
                Rect::from_origin_size(popup.options.position, desired),
                &mut layout,
            )?;
        }
        Ok(())
    }

    /// Lay out if needed, then draw the content and popups (oldest first) in paint order.
    pub fn render(&mut self, gfx: &mut dyn GraphicsContext) -> Result<(), WindowError> {
        self.ensure_open()?;
        self.render_pending.store(false, Ordering::Release);
        let needs_layout = self.tree.needs_layout(self.content)
            || self.popups.iter().any(|p| self.tree.needs_layout(p.root));
        if needs_layout {
            self.update_layout()?;
        }
        let mut roots = vec![self.content];
        roots.extend(self.popups.iter().map(|p| p.root));
        for root in roots {
            self.paint(root, gfx);
        }
        Ok(())
    }

    fn paint(&mut self, root: ElementId, gfx: &mut dyn GraphicsContext) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let visible = self
                .tree
                .flags(id)
                .is_some_and(|f| f.contains(ElementFlags::VISIBLE));
            if !visible {
                continue;
            }
            if let Some(mut control) = self.controls.take(id) {
                let origin = self
                    .tree
                    .world_bounds(id)
                    .unwrap_or(Rect::ZERO)
                    .origin();
                gfx.push_transform(Affine::translate(origin.to_vec2()));
                {
                    let mut cx = RenderCx {
                        tree: &self.tree,
                        id,
                    };
                    control.render(&mut cx, gfx);
                }
                gfx.pop_transform();
                self.controls.restore(id, control);
            }
            self.tree.clear_visual(id);
            stack.extend(self.tree.children(id).iter().rev().copied());
        }
    }
}
