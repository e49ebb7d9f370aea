// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Focus manager.
//!
//! A window has at most one focused element. Focus only lands on elements that are
//! focusable, effectively enabled, effectively visible, and attached to the content root
//! or an open popup. Every change updates the popup-aware focus-within chain, notifies the
//! affected controls, closes popups that lost focus, lets the nearest
//! [`FocusIntoViewHost`](crate::control::FocusIntoViewHost) ancestor react, and requests a
//! command re-query.

use arbor_responder::adapters::tree::PopupAware;
use arbor_responder::focus::FocusEvent;
use arbor_responder::types::{BubbleParent, Phase};
use arbor_tree::traverse::{MAX_DEFAULT_FOCUS_HOPS, MAX_OWNER_HOPS, bounded_walk};
use arbor_tree::{ElementFlags, ElementId, ElementState};
use log::{debug, trace};

use crate::control::{EventCx, Notification};
use crate::window::{Window, WindowState, owner_in};

impl Window {
    /// The focused element.
    pub fn focused(&self) -> Option<ElementId> {
        self.focus.focused()
    }

    /// Returns true if `id` is focused or on the focused element's popup-aware chain.
    pub fn is_focus_within(&self, id: ElementId) -> bool {
        self.focus.is_within(id)
    }

    /// Focus `id`. Same as `set_focus(Some(id))`.
    pub fn focus(&mut self, id: ElementId) -> bool {
        self.set_focus(Some(id))
    }

    /// Move focus to `target`, or clear it with `None`.
    ///
    /// The target is first redirected through [`Control::default_focus_target`] (at most
    /// [`MAX_DEFAULT_FOCUS_HOPS`] hops). Returns false without changing anything if the
    /// resolved element cannot take focus. Clearing always succeeds.
    ///
    /// [`Control::default_focus_target`]: crate::control::Control::default_focus_target
    pub fn set_focus(&mut self, target: Option<ElementId>) -> bool {
        let Some(candidate) = target else {
            self.apply_focus(None);
            return true;
        };
        if self.state == WindowState::Closed || !self.tree.is_alive(candidate) {
            return false;
        }
        let resolved = self.resolve_default_focus(candidate);
        if !self.can_focus(resolved) {
            debug!("refusing focus for {resolved:?} (requested {candidate:?})");
            return false;
        }
        if self.focus.focused() != Some(resolved) {
            self.apply_focus(Some(resolved));
        }
        true
    }

    /// Clear focus.
    pub fn clear_focus(&mut self) {
        self.apply_focus(None);
    }

    pub(crate) fn can_focus(&self, id: ElementId) -> bool {
        self.tree.is_focus_eligible(id) && self.is_attached(id)
    }

    fn resolve_default_focus(&self, start: ElementId) -> ElementId {
        bounded_walk(start, MAX_DEFAULT_FOCUS_HOPS, |k| {
            self.controls
                .get(k)
                .and_then(|c| c.default_focus_target())
                .filter(|&t| self.tree.is_alive(t))
        })
        .last()
    }

    /// Move focus without eligibility checks and run every side effect of the change.
    pub(crate) fn apply_focus(&mut self, new: Option<ElementId>) {
        let old_chain = self.focus.chain().to_vec();
        let chain = new.map(|n| self.chain(n)).unwrap_or_default();
        let events = self.focus.update_chain(&chain);
        if events.is_empty() {
            return;
        }
        for event in events {
            match event {
                FocusEvent::Blur(k) => {
                    self.tree.set_state(k, ElementState::FOCUSED, false);
                    self.notify(k, Notification::FocusChanged(false));
                }
                FocusEvent::LeaveWithin(k) => {
                    self.tree.set_state(k, ElementState::FOCUS_WITHIN, false);
                    self.notify(k, Notification::FocusWithinChanged(false));
                }
                FocusEvent::EnterWithin(k) => {
                    self.tree.set_state(k, ElementState::FOCUS_WITHIN, true);
                    self.notify(k, Notification::FocusWithinChanged(true));
                }
                FocusEvent::Focus(k) => {
                    self.tree.set_state(k, ElementState::FOCUSED, true);
                    self.notify(k, Notification::FocusChanged(true));
                }
            }
        }
        debug!("focus moved to {new:?} in {:?}", self.id);

        let lost: Vec<ElementId> = self
            .popups
            .iter()
            .filter(|p| {
                !p.options.stays_open
                    && old_chain.contains(&p.root)
                    && !self.focus.is_within(p.root)
            })
            .map(|p| p.root)
            .collect();
        for root in lost {
            debug!("popup {root:?} lost focus");
            self.close_popup(root);
        }

        if let Some(n) = new
            && self.focus.focused() == Some(n)
        {
            self.bring_into_view(n);
        }
        if self.state != WindowState::Closed {
            self.app.request_command_requery();
            self.request_render();
        }
    }

    /// Offer `focused` to the nearest ancestor that scrolls focused descendants into view.
    fn bring_into_view(&mut self, focused: ElementId) {
        let ancestors = self.router().bubble_path(focused);
        for &a in ancestors.iter().skip(1) {
            let Some(mut control) = self.controls.take(a) else {
                continue;
            };
            let acted = control.as_focus_into_view_host().map(|host| {
                let mut cx = EventCx::new(self, a, focused, Phase::Bubble);
                host.on_descendant_focused(&mut cx, focused)
            });
            self.controls.restore(a, control);
            if let Some(acted) = acted {
                trace!("focus-into-view host {a:?} for {focused:?}: acted={acted}");
                return;
            }
        }
    }

    /// Focusable elements of the content tree, in tab order.
    ///
    /// Under a [`SelectedContentHost`](crate::control::SelectedContentHost) only the
    /// selected content is walked; if it yields nothing, the host itself is used when it
    /// can take focus.
    pub fn tab_order(&self) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.collect_tab_stops(self.content, &mut out);
        out
    }

    fn collect_tab_stops(&self, id: ElementId, out: &mut Vec<ElementId>) {
        let visible = self
            .tree
            .flags(id)
            .is_some_and(|f| f.contains(ElementFlags::VISIBLE));
        if !visible {
            return;
        }
        if let Some(host) = self
            .controls
            .get(id)
            .and_then(|c| c.as_selected_content_host())
        {
            let before = out.len();
            if let Some(content) = host.selected_content()
                && content != id
                && self.tree.is_alive(content)
                && self.tree.is_ancestor_or_self(id, content)
            {
                self.collect_tab_stops(content, out);
            }
            if out.len() == before && self.tree.is_focus_eligible(id) {
                out.push(id);
            }
            return;
        }
        if self.tree.is_focus_eligible(id) {
            out.push(id);
        }
        for &child in self.tree.children(id) {
            self.collect_tab_stops(child, out);
        }
    }

    /// Move focus to the next tab stop, wrapping at the end.
    pub fn move_focus_next(&mut self) -> bool {
        self.move_focus(true)
    }

    /// Move focus to the previous tab stop, wrapping at the start.
    pub fn move_focus_previous(&mut self) -> bool {
        self.move_focus(false)
    }

    fn move_focus(&mut self, forward: bool) -> bool {
        let order = self.tab_order();
        let len = order.len();
        if len == 0 {
            return false;
        }
        let focused = self.focus.focused();
        let next = match focused.and_then(|f| self.tab_anchor(f, &order)) {
            None if forward => 0,
            None => len - 1,
            Some(i) => {
                let at_boundary = if forward { i + 1 == len } else { i == 0 };
                if at_boundary
                    && let Some(f) = focused
                    && self.offer_to_virtualized_host(f, forward)
                {
                    return true;
                }
                if forward { (i + 1) % len } else { (i + len - 1) % len }
            }
        };
        self.set_focus(Some(order[next]))
    }

    /// Position in `order` of `focused` or its nearest popup-aware ancestor.
    fn tab_anchor(&self, focused: ElementId, order: &[ElementId]) -> Option<usize> {
        let popups = &self.popups;
        let parents = PopupAware::new(&self.tree, |id| owner_in(popups, id));
        let walk = bounded_walk(focused, MAX_OWNER_HOPS, |k| parents.bubble_parent(&k));
        walk.visited
            .iter()
            .find_map(|k| order.iter().position(|o| o == k))
    }

    /// Let the nearest virtualized tab host above `from` handle a wrapping move.
    fn offer_to_virtualized_host(&mut self, from: ElementId, forward: bool) -> bool {
        let ancestors = self.router().bubble_path(from);
        for &a in ancestors.iter().skip(1) {
            let Some(mut control) = self.controls.take(a) else {
                continue;
            };
            let moved = control.as_virtualized_tab_host().map(|host| {
                let mut cx = EventCx::new(self, a, from, Phase::Bubble);
                host.try_move_focus_from_descendant(&mut cx, from, forward)
            });
            self.controls.restore(a, control);
            if let Some(moved) = moved {
                trace!("virtualized tab host {a:?} from {from:?}: moved={moved}");
                return moved;
            }
        }
        false
    }
}
