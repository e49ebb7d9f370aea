// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input routing: the entry points for raw platform events.
//!
//! Pointer events go to the captured element, or else to the topmost hit among the open
//! popups (newest first) and the content root. Keyboard and text events go to the focused
//! element. Either way the event is offered to the target and then bubbles through the
//! popup-aware parent chain until a handler marks it handled. Elements that are not
//! effectively enabled are skipped.

use arbor_responder::dispatcher;
use arbor_responder::text_input::SuppressibleKey;
use arbor_responder::types::{Dispatch, Outcome};
use arbor_tree::{ElementFlags, ElementId, ElementState};
use kurbo::Point;
use log::{debug, trace};

use crate::control::{Control, EventCx};
use crate::event::{ButtonState, Key, KeyEvent, Modifiers, MouseButtonEvent, MouseEvent, WheelEvent};
use crate::window::{Window, WindowState};

/// Hook run before a mouse-down is hit-tested.
pub type BeforeMouseDownHook = Box<dyn FnMut(&mut Window, &MouseButtonEvent)>;

/// Hook run with the resolved mouse-down hit, before focus and dispatch.
pub type AfterMouseDownHitTestHook = Box<dyn FnMut(&mut Window, Option<ElementId>)>;

/// Application hooks around mouse-down routing.
#[derive(Default)]
pub struct InputHooks {
    /// See [`BeforeMouseDownHook`].
    pub before_mouse_down: Option<BeforeMouseDownHook>,
    /// See [`AfterMouseDownHitTestHook`].
    pub after_mouse_down_hit_test: Option<AfterMouseDownHitTestHook>,
}

impl core::fmt::Debug for InputHooks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InputHooks")
            .field("before_mouse_down", &self.before_mouse_down.is_some())
            .field(
                "after_mouse_down_hit_test",
                &self.after_mouse_down_hit_test.is_some(),
            )
            .finish()
    }
}

impl Window {
    /// Replace both mouse-down hooks.
    pub fn set_input_hooks(&mut self, hooks: InputHooks) {
        self.hooks = hooks;
    }

    /// Install the hook run before each mouse-down is hit-tested.
    pub fn set_before_mouse_down_hook(
        &mut self,
        hook: impl FnMut(&mut Window, &MouseButtonEvent) + 'static,
    ) {
        self.hooks.before_mouse_down = Some(Box::new(hook));
    }

    /// Install the hook run after each mouse-down is hit-tested.
    pub fn set_after_mouse_down_hit_test_hook(
        &mut self,
        hook: impl FnMut(&mut Window, Option<ElementId>) + 'static,
    ) {
        self.hooks.after_mouse_down_hit_test = Some(Box::new(hook));
    }

    /// Topmost element at a window-relative point, ignoring capture.
    pub fn hit_test(&self, point: Point) -> Option<ElementId> {
        self.popups
            .iter()
            .rev()
            .find_map(|p| self.tree.hit_test_point(p.root, point))
            .or_else(|| self.tree.hit_test_point(self.content, point))
            .map(|hit| hit.node)
    }

    /// Route all pointer input to `id` until released.
    ///
    /// Refused for elements that are stale, detached, disabled, or hidden.
    pub fn capture_mouse(&mut self, id: ElementId) -> bool {
        if self.state == WindowState::Closed || !self.can_capture(id) {
            return false;
        }
        if self.capture == Some(id) {
            return true;
        }
        if let Some(old) = self.capture.replace(id) {
            self.tree.set_state(old, ElementState::CAPTURED, false);
        } else {
            self.backend.capture_mouse();
        }
        self.tree.set_state(id, ElementState::CAPTURED, true);
        debug!("mouse captured by {id:?}");
        true
    }

    /// Release pointer capture, if held.
    pub fn release_mouse_capture(&mut self) {
        if let Some(old) = self.capture.take() {
            self.tree.set_state(old, ElementState::CAPTURED, false);
            self.backend.release_mouse_capture();
            debug!("mouse capture released by {old:?}");
        }
    }

    /// The element holding pointer capture.
    pub fn captured(&self) -> Option<ElementId> {
        self.capture
    }

    pub(crate) fn can_capture(&self, id: ElementId) -> bool {
        self.is_attached(id)
            && self.tree.is_effectively_enabled(id)
            && self.tree.is_effectively_visible(id)
    }

    fn accepts_input(&self) -> bool {
        if self.state == WindowState::Shown {
            true
        } else {
            trace!("dropping input for {:?} in state {:?}", self.id, self.state);
            false
        }
    }

    /// Offer an event along `seq`, stopping at the first handler that marks it handled.
    fn dispatch(
        &mut self,
        seq: &[Dispatch<ElementId>],
        mut call: impl FnMut(&mut dyn Control, &mut EventCx<'_>),
    ) -> bool {
        let Some(target) = seq.first().map(|d| d.node) else {
            return false;
        };
        dispatcher::run(seq, |step| {
            if !self.tree.is_effectively_enabled(step.node) {
                return Outcome::Continue;
            }
            let Some(mut control) = self.controls.take(step.node) else {
                return Outcome::Continue;
            };
            let handled = {
                let mut cx = EventCx::new(self, step.node, target, step.phase);
                call(control.as_mut(), &mut cx);
                cx.is_handled()
            };
            self.controls.restore(step.node, control);
            Outcome::from_handled(handled)
        })
        .inspect(|&i| trace!("handled by {:?}", seq[i].node))
        .is_some()
    }

    /// Pointer target for `point`: the captured element, else the hit.
    fn pointer_target(&self, point: Point) -> Option<ElementId> {
        self.capture.or_else(|| self.hit_test(point))
    }

    /// Pointer moved. Updates mouse-over and bubbles `mouse_move`.
    pub fn mouse_move(&mut self, event: &MouseEvent) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let target = self.pointer_target(event.position);
        self.update_mouse_over(target);
        let seq = self.router().dispatch_for(target);
        self.dispatch(&seq, |c, cx| c.mouse_move(cx, event))
    }

    /// Button pressed or released.
    ///
    /// A press runs the before-hook, hit-tests, closes light-dismiss popups the hit is
    /// outside of, runs the after-hook, focuses a focusable target, and bubbles
    /// `mouse_down`. A double click then bubbles `double_click` as a separate pass.
    /// Nothing runs, hooks included, unless the window is shown.
    pub fn mouse_button(&mut self, event: &MouseButtonEvent) -> bool {
        if !self.accepts_input() {
            return false;
        }
        match event.state {
            ButtonState::Pressed => self.mouse_down(event),
            ButtonState::Released => {
                let target = self.pointer_target(event.position);
                let seq = self.router().dispatch_for(target);
                self.dispatch(&seq, |c, cx| c.mouse_up(cx, event))
            }
        }
    }

    fn mouse_down(&mut self, event: &MouseButtonEvent) -> bool {
        if let Some(mut hook) = self.hooks.before_mouse_down.take() {
            hook(self, event);
            if self.hooks.before_mouse_down.is_none() {
                self.hooks.before_mouse_down = Some(hook);
            }
        }
        if self.state != WindowState::Shown {
            return false;
        }
        let hit = self.hit_test(event.position);
        self.light_dismiss(hit);
        if let Some(mut hook) = self.hooks.after_mouse_down_hit_test.take() {
            hook(self, hit);
            if self.hooks.after_mouse_down_hit_test.is_none() {
                self.hooks.after_mouse_down_hit_test = Some(hook);
            }
        }
        let target = self
            .router()
            .resolve(hit)
            .filter(|&t| self.is_attached(t));
        self.update_mouse_over(target);
        if let Some(t) = target
            && self
                .tree
                .flags(t)
                .is_some_and(|f| f.contains(ElementFlags::FOCUSABLE))
        {
            self.set_focus(Some(t));
        }
        let seq = self.router().dispatch_for(target);
        let handled = self.dispatch(&seq, |c, cx| c.mouse_down(cx, event));
        if event.is_double_click() {
            let again = self.dispatch(&seq, |c, cx| c.double_click(cx, event));
            return handled || again;
        }
        handled
    }

    /// Close light-dismiss popups whose popup-aware chain the hit is not part of.
    fn light_dismiss(&mut self, hit: Option<ElementId>) {
        let chain = hit.map(|h| self.chain(h)).unwrap_or_default();
        let doomed: Vec<ElementId> = self
            .popups
            .iter()
            .filter(|p| p.options.light_dismiss && !chain.contains(&p.root))
            .map(|p| p.root)
            .collect();
        for root in doomed.into_iter().rev() {
            debug!("light dismiss of popup {root:?}");
            self.close_popup(root);
        }
    }

    /// Wheel scrolled.
    pub fn mouse_wheel(&mut self, event: &WheelEvent) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let target = self.pointer_target(event.position);
        let seq = self.router().dispatch_for(target);
        self.dispatch(&seq, |c, cx| c.mouse_wheel(cx, event))
    }

    /// Pointer left the window. Mouse-over is kept while capture is held.
    pub fn mouse_leave(&mut self) {
        if self.capture.is_none() {
            self.update_mouse_over(None);
        }
    }

    /// Key pressed. Bubbles `key_down` from the focused element.
    ///
    /// An unhandled Tab (Shift+Tab) without Control, Alt, or Meta moves focus forward
    /// (backward); when focus moves the event counts as handled and the following `'\t'`
    /// text is dropped.
    pub fn key_down(&mut self, event: &KeyEvent) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.suppression.reset_per_key_down();
        let seq = self.router().dispatch_for(self.focus.focused());
        if self.dispatch(&seq, |c, cx| c.key_down(cx, event)) {
            return true;
        }
        let chorded = event
            .modifiers
            .intersects(Modifiers::CONTROL | Modifiers::ALT | Modifiers::META);
        if event.key == Key::Tab && !chorded {
            let moved = if event.modifiers.contains(Modifiers::SHIFT) {
                self.move_focus_previous()
            } else {
                self.move_focus_next()
            };
            if moved {
                self.suppression
                    .suppress_next_from_handled_key_down(SuppressibleKey::Tab);
                return true;
            }
        }
        false
    }

    /// Key released. Bubbles `key_up` from the focused element.
    pub fn key_up(&mut self, event: &KeyEvent) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let seq = self.router().dispatch_for(self.focus.focused());
        self.dispatch(&seq, |c, cx| c.key_up(cx, event))
    }

    /// Committed text. Characters suppressed by a handled key-down are dropped first; if
    /// nothing remains the text counts as consumed.
    pub fn text_input(&mut self, text: &str) -> bool {
        if !self.accepts_input() || text.is_empty() {
            return false;
        }
        let filtered: String = text
            .chars()
            .filter(|&c| !self.suppression.try_consume_char(c))
            .collect();
        if filtered.is_empty() {
            return true;
        }
        let seq = self.router().dispatch_for(self.focus.focused());
        self.dispatch(&seq, |c, cx| c.text_input(cx, &filtered))
    }
}
