// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A dropdown whose popup bubbles unhandled input to the button that opened it.
//!
//! Run:
//! - `RUST_LOG=arbor_window=debug cargo run -p arbor_demos --example popup_menu`

use std::sync::Arc;

use arbor_tree::{ElementFlags, ElementId};
use arbor_window::{
    AppContext, Control, EventCx, HeadlessBackend, Key, KeyEvent, LayoutCx, MouseButton,
    MouseButtonEvent, PopupOptions, Window, WindowOptions,
};
use kurbo::{Point, Size, Vec2};

struct Dropdown {
    menu: ElementId,
}

impl Control for Dropdown {
    fn mouse_down(&mut self, cx: &mut EventCx<'_>, event: &MouseButtonEvent) {
        let owner = cx.id();
        let below = event.position + Vec2::new(0.0, 4.0);
        let window = cx.window();
        if window.popups().contains(&self.menu) {
            println!("dropdown: click bubbled up from the menu");
            window.close_popup(self.menu);
        } else {
            let options = PopupOptions {
                owner: Some(owner),
                position: below,
                light_dismiss: true,
                ..PopupOptions::default()
            };
            if let Err(err) = window.open_popup(self.menu, options) {
                log::warn!("could not open menu: {err}");
            }
        }
        cx.set_handled();
    }

    fn key_down(&mut self, cx: &mut EventCx<'_>, event: &KeyEvent) {
        if event.key == Key::Escape {
            println!("dropdown: escape from {:?}", cx.target());
            cx.window().close_popup(self.menu);
            cx.set_handled();
        }
    }
}

/// Fixed-size popup body.
struct Menu;

impl Control for Menu {
    fn measure(&mut self, cx: &mut LayoutCx<'_>, _available: Size) -> Size {
        let size = Size::new(120.0, 90.0);
        cx.measure_children(size);
        size
    }
}

struct Item(&'static str);

impl Control for Item {
    fn focus_changed(&mut self, focused: bool) {
        if focused {
            println!("menu item {:?} focused", self.0);
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let app = AppContext::new();
    let backend = Arc::new(HeadlessBackend::new(Size::new(400.0, 300.0)));
    let mut window = Window::new(&app, backend, WindowOptions::default());
    let root = window.content_root();

    let menu = window.insert(None, ElementFlags::default(), Some(Box::new(Menu)))?;
    let item = window.add_child(
        menu,
        ElementFlags::default() | ElementFlags::FOCUSABLE,
        Item("Copy"),
    )?;
    window.add_child(root, ElementFlags::default(), Dropdown { menu })?;
    window.show()?;

    // Open, then click inside: the menu has no handler so the dropdown sees it.
    let press = |x, y| MouseButtonEvent::press(Point::new(x, y), MouseButton::Left);
    window.mouse_button(&press(10.0, 10.0));
    window.update_layout()?;
    println!("open popups: {:?}", window.popups());
    window.focus(item);
    window.key_down(&KeyEvent::new(Key::Escape));
    println!("after escape: {:?}, focus {:?}", window.popups(), window.focused());

    app.process()?;
    window.close();
    Ok(())
}
