// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw input events, in logical window coordinates.

use kurbo::{Point, Vec2};

bitflags::bitflags! {
    /// Modifier key snapshot.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Either Shift key.
        const SHIFT = 1 << 0;
        /// Either Control key.
        const CONTROL = 1 << 1;
        /// Either Alt/Option key.
        const ALT = 1 << 2;
        /// Either Meta/Command/Windows key.
        const META = 1 << 3;
    }
}

/// Mouse buttons.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Wheel button.
    Middle,
    /// Browser-back side button.
    Back,
    /// Browser-forward side button.
    Forward,
}

/// Whether a button went down or up.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ButtonState {
    /// The button was pressed.
    Pressed,
    /// The button was released.
    Released,
}

/// Pointer motion.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MouseEvent {
    /// Window-relative position.
    pub position: Point,
    /// Modifier keys held during the move.
    pub modifiers: Modifiers,
}

impl MouseEvent {
    /// Motion to `position` with no modifiers.
    pub fn new(position: Point) -> Self {
        Self {
            position,
            modifiers: Modifiers::empty(),
        }
    }
}

/// Mouse button press or release.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MouseButtonEvent {
    /// Window-relative position.
    pub position: Point,
    /// Button that changed.
    pub button: MouseButton,
    /// New button state.
    pub state: ButtonState,
    /// 1 for a single click, 2 for a double click.
    pub click_count: u8,
    /// Modifier keys held.
    pub modifiers: Modifiers,
}

impl MouseButtonEvent {
    /// Single press of `button` at `position`.
    pub fn press(position: Point, button: MouseButton) -> Self {
        Self {
            position,
            button,
            state: ButtonState::Pressed,
            click_count: 1,
            modifiers: Modifiers::empty(),
        }
    }

    /// Release of `button` at `position`.
    pub fn release(position: Point, button: MouseButton) -> Self {
        Self {
            state: ButtonState::Released,
            ..Self::press(position, button)
        }
    }

    /// Same event with a different click count.
    #[must_use]
    pub fn with_click_count(mut self, click_count: u8) -> Self {
        self.click_count = click_count;
        self
    }

    /// Same event with modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Returns true for a press that completes a double click.
    pub fn is_double_click(&self) -> bool {
        self.state == ButtonState::Pressed && self.click_count == 2
    }
}

/// Scroll wheel or touchpad scroll.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WheelEvent {
    /// Window-relative position.
    pub position: Point,
    /// Scroll delta in logical units.
    pub delta: Vec2,
    /// Modifier keys held.
    pub modifiers: Modifiers,
}

/// Logical keys the core cares about; everything else is carried through.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Tab.
    Tab,
    /// Enter/Return.
    Enter,
    /// Escape.
    Escape,
    /// Space bar.
    Space,
    /// Backspace.
    Backspace,
    /// Forward delete.
    Delete,
    /// Left arrow.
    ArrowLeft,
    /// Right arrow.
    ArrowRight,
    /// Up arrow.
    ArrowUp,
    /// Down arrow.
    ArrowDown,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// A key producing a character.
    Character(char),
    /// Platform key code with no logical mapping here.
    Other(u32),
}

/// Key press or release.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    /// Logical key.
    pub key: Key,
    /// Modifier keys held.
    pub modifiers: Modifiers,
    /// Auto-repeat.
    pub repeat: bool,
}

impl KeyEvent {
    /// Non-repeating event for `key` with no modifiers.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::empty(),
            repeat: false,
        }
    }

    /// Same event with modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}
