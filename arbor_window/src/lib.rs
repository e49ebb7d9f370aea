// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Window: controls, input routing, and focus management on top of [`arbor_tree`].
//!
//! ## Overview
//!
//! A [`Window`] owns an element tree with one content root, a [`Control`] per element
//! that wants behavior, and the interaction state around it: the focused element, the
//! pointer capture, the mouse-over chain, and a stack of popups. It talks to the platform
//! through a [`WindowBackend`] and schedules repaints on the [`AppContext`]'s dispatcher,
//! so any number of invalidations within one dispatcher turn produce one render pass.
//!
//! Raw platform events enter through [`Window::mouse_move`], [`Window::mouse_button`],
//! [`Window::mouse_wheel`], [`Window::key_down`], [`Window::key_up`], and
//! [`Window::text_input`], in logical window coordinates. Popup roots bubble unhandled
//! input to their owners.
//!
//! ```
//! use std::sync::Arc;
//! use arbor_tree::ElementFlags;
//! use arbor_window::{AppContext, Control, HeadlessBackend, Window, WindowOptions};
//!
//! struct Button;
//! impl Control for Button {}
//!
//! let app = AppContext::new();
//! let backend = Arc::new(HeadlessBackend::default());
//! let mut window = Window::new(&app, backend.clone(), WindowOptions::default());
//! let content = window.content_root();
//! let ok = window
//!     .add_child(content, ElementFlags::default() | ElementFlags::FOCUSABLE, Button)
//!     .unwrap();
//!
//! window.show().unwrap();
//! assert!(window.focus(ok));
//! app.process().unwrap();
//! assert_eq!(backend.invalidate_count(), 1);
//! ```

mod app;
mod backend;
mod control;
mod event;
mod focus;
mod input;
mod window;

pub use app::{AppContext, WindowId};
pub use backend::{
    Color, DrawOp, GraphicsContext, HeadlessBackend, NativeHandle, RecordingContext,
    WindowBackend,
};
pub use control::{
    Control, EventCx, FocusIntoViewHost, LayoutCx, RenderCx, SelectedContentHost,
    VirtualizedTabHost,
};
pub use event::{
    ButtonState, Key, KeyEvent, Modifiers, MouseButton, MouseButtonEvent, MouseEvent,
    WheelEvent,
};
pub use input::{AfterMouseDownHitTestHook, BeforeMouseDownHook, InputHooks};
pub use window::{PopupOptions, Window, WindowError, WindowOptions, WindowState};
