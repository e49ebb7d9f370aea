// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A headless window with a row of buttons: clicks, hover, and tab navigation.
//!
//! Run:
//! - `RUST_LOG=debug cargo run -p arbor_demos --example window_basics`

use std::sync::Arc;

use arbor_tree::ElementFlags;
use arbor_window::{
    AppContext, Color, Control, DrawOp, EventCx, GraphicsContext, HeadlessBackend, Key,
    KeyEvent, LayoutCx, MouseButton, MouseButtonEvent, MouseEvent, RecordingContext, RenderCx,
    Window, WindowOptions,
};
use kurbo::{Point, Rect, Size};

/// Lays children out left to right in equal columns.
struct Row;

impl Control for Row {
    fn measure(&mut self, cx: &mut LayoutCx<'_>, available: Size) -> Size {
        let children = cx.children();
        let width = available.width / children.len().max(1) as f64;
        for child in children {
            cx.measure_child(child, Size::new(width, available.height));
        }
        available
    }

    fn arrange(&mut self, cx: &mut LayoutCx<'_>, final_size: Size) {
        let children = cx.children();
        let width = final_size.width / children.len().max(1) as f64;
        for (i, child) in children.into_iter().enumerate() {
            let x = i as f64 * width;
            cx.arrange_child(child, Rect::new(x, 0.0, x + width, final_size.height));
        }
    }
}

struct Button {
    label: &'static str,
    hovered: bool,
}

impl Control for Button {
    fn render(&mut self, cx: &mut RenderCx<'_>, gfx: &mut dyn GraphicsContext) {
        let fill = if self.hovered {
            Color::rgb(200, 220, 255)
        } else {
            Color::rgb(230, 230, 230)
        };
        let bounds = Rect::from_origin_size(Point::ZERO, cx.size());
        gfx.fill_rect(bounds, fill);
        if cx.state().contains(arbor_tree::ElementState::FOCUSED) {
            gfx.stroke_rect(bounds, Color::BLACK, 2.0);
        }
        gfx.draw_text(self.label, Point::new(8.0, 8.0), 14.0, Color::BLACK);
    }

    fn mouse_down(&mut self, cx: &mut EventCx<'_>, event: &MouseButtonEvent) {
        println!("{} pressed at {:?}", self.label, cx.to_local(event.position));
        cx.set_handled();
    }

    fn key_down(&mut self, cx: &mut EventCx<'_>, event: &KeyEvent) {
        if event.key == Key::Space {
            println!("{} activated from the keyboard", self.label);
            cx.set_handled();
        }
    }

    fn pointer_entered(&mut self) {
        self.hovered = true;
    }

    fn pointer_exited(&mut self) {
        self.hovered = false;
    }

    fn focus_changed(&mut self, focused: bool) {
        println!("{} {}", self.label, if focused { "focused" } else { "blurred" });
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let app = AppContext::new();
    let backend = Arc::new(HeadlessBackend::default());
    let mut window = Window::new(
        &app,
        backend.clone(),
        WindowOptions {
            title: "Arbor basics".into(),
            initial_size: Some(Size::new(300.0, 40.0)),
        },
    );
    let root = window.content_root();
    window.set_control(root, Box::new(Row))?;
    let focusable = ElementFlags::default() | ElementFlags::FOCUSABLE;
    for label in ["Open", "Save", "Quit"] {
        window.add_child(
            root,
            focusable,
            Button {
                label,
                hovered: false,
            },
        )?;
    }

    window.show()?;
    window.mouse_move(&MouseEvent::new(Point::new(150.0, 20.0)));
    window.mouse_button(&MouseButtonEvent::press(
        Point::new(150.0, 20.0),
        MouseButton::Left,
    ));
    window.key_down(&KeyEvent::new(Key::Tab));
    window.key_down(&KeyEvent::new(Key::Space));
    app.process()?;

    let mut gfx = RecordingContext::new();
    window.render(&mut gfx)?;
    for op in gfx.ops() {
        if let DrawOp::Text(text, origin) = op {
            println!("drew {text:?} at {origin:?}");
        }
    }
    println!(
        "title {:?}, {} repaint request(s)",
        backend.title(),
        backend.invalidate_count()
    );
    window.close();
    Ok(())
}
