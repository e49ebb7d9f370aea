// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Platform and rendering boundaries, plus headless implementations of both.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use kurbo::{Affine, Point, Rect, Size};
use parking_lot::Mutex;

use crate::window::WindowOptions;

/// Opaque platform window handle. Windows have none until shown.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub NonZeroU64);

/// The platform side of a window.
///
/// Methods take `&self` because repaint requests arrive from dispatcher actions, which may
/// hold their own reference to the backend.
pub trait WindowBackend: Send + Sync {
    /// Create or reveal the native window and return its handle.
    fn show(&self, options: &WindowOptions) -> NativeHandle;
    /// Hide without destroying.
    fn hide(&self);
    /// Destroy the native window and release its resources.
    fn close(&self);
    /// Ask the platform for a repaint.
    fn invalidate(&self);
    /// Change the title bar text.
    fn set_title(&self, title: &str);
    /// Route all pointer input to this window.
    fn capture_mouse(&self);
    /// Undo [`capture_mouse`](Self::capture_mouse).
    fn release_mouse_capture(&self);
    /// Convert a logical client point to screen coordinates.
    fn client_to_screen(&self, point: Point) -> Point;
    /// Convert a logical screen point to client coordinates.
    fn screen_to_client(&self, point: Point) -> Point;
    /// Window position on screen.
    fn position(&self) -> Point;
    /// Move the window.
    fn set_position(&self, position: Point);
    /// Logical client area size.
    fn client_size(&self) -> Size;
    /// Device pixels per logical unit.
    fn scale_factor(&self) -> f64;
}

/// Drawing surface handed to controls during the render pass.
pub trait GraphicsContext {
    /// Fill `rect` with `color`.
    fn fill_rect(&mut self, rect: Rect, color: Color);
    /// Outline `rect`.
    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64);
    /// Draw `text` with its top-left corner at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point, font_size: f64, color: Color);
    /// Size `text` would occupy at `font_size`.
    fn measure_text(&mut self, text: &str, font_size: f64) -> Size;
    /// Intersect the clip with `rect`.
    fn push_clip(&mut self, rect: Rect);
    /// Undo the last [`push_clip`](Self::push_clip).
    fn pop_clip(&mut self);
    /// Prepend `transform` to the current transform.
    fn push_transform(&mut self, transform: Affine);
    /// Undo the last [`push_transform`](Self::push_transform).
    fn pop_transform(&mut self);
}

/// 8-bit RGBA color.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct HeadlessState {
    handle: Option<NativeHandle>,
    visible: bool,
    closed: bool,
    title: String,
    size: Size,
    position: Point,
    scale: f64,
    captured: bool,
    invalidations: usize,
}

/// In-memory backend that records what the core asked of it.
#[derive(Debug)]
pub struct HeadlessBackend {
    state: Mutex<HeadlessState>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0))
    }
}

impl HeadlessBackend {
    /// A hidden backend with the given client size.
    pub fn new(size: Size) -> Self {
        Self {
            state: Mutex::new(HeadlessState {
                handle: None,
                visible: false,
                closed: false,
                title: String::new(),
                size,
                position: Point::ZERO,
                scale: 1.0,
                captured: false,
                invalidations: 0,
            }),
        }
    }

    /// Simulate a platform resize.
    pub fn set_client_size(&self, size: Size) {
        self.state.lock().size = size;
    }

    /// Simulate a DPI change.
    pub fn set_scale_factor(&self, scale: f64) {
        self.state.lock().scale = scale;
    }

    /// Number of repaint requests received.
    pub fn invalidate_count(&self) -> usize {
        self.state.lock().invalidations
    }

    /// Current title.
    pub fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    /// Returns true while shown.
    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    /// Returns true once closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns true while the window holds platform mouse capture.
    pub fn is_mouse_captured(&self) -> bool {
        self.state.lock().captured
    }
}

impl WindowBackend for HeadlessBackend {
    fn show(&self, options: &WindowOptions) -> NativeHandle {
        let mut state = self.state.lock();
        if state.handle.is_none() {
            state.title.clone_from(&options.title);
            if let Some(size) = options.initial_size {
                state.size = size;
            }
        }
        state.visible = true;
        *state.handle.get_or_insert_with(|| {
            let raw = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
            NativeHandle(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
        })
    }

    fn hide(&self) {
        self.state.lock().visible = false;
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.visible = false;
        state.closed = true;
        state.captured = false;
        state.handle = None;
    }

    fn invalidate(&self) {
        self.state.lock().invalidations += 1;
    }

    fn set_title(&self, title: &str) {
        title.clone_into(&mut self.state.lock().title);
    }

    fn capture_mouse(&self) {
        self.state.lock().captured = true;
    }

    fn release_mouse_capture(&self) {
        self.state.lock().captured = false;
    }

    fn client_to_screen(&self, point: Point) -> Point {
        point + self.state.lock().position.to_vec2()
    }

    fn screen_to_client(&self, point: Point) -> Point {
        point - self.state.lock().position.to_vec2()
    }

    fn position(&self) -> Point {
        self.state.lock().position
    }

    fn set_position(&self, position: Point) {
        self.state.lock().position = position;
    }

    fn client_size(&self) -> Size {
        self.state.lock().size
    }

    fn scale_factor(&self) -> f64 {
        self.state.lock().scale
    }
}

/// One recorded drawing command.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// [`GraphicsContext::fill_rect`], in window coordinates.
    FillRect(Rect, Color),
    /// [`GraphicsContext::stroke_rect`], in window coordinates.
    StrokeRect(Rect, Color, f64),
    /// [`GraphicsContext::draw_text`], origin in window coordinates.
    Text(String, Point),
}

/// Graphics context that records drawing in window coordinates.
///
/// Text is measured with a fixed advance of 0.6 em per character and a 1.2 em line.
#[derive(Clone, Debug, Default)]
pub struct RecordingContext {
    ops: Vec<DrawOp>,
    transforms: Vec<Affine>,
    clips: Vec<Rect>,
}

impl RecordingContext {
    /// Empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything drawn so far.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Current clip depth.
    pub fn clip_depth(&self) -> usize {
        self.clips.len()
    }

    fn current(&self) -> Affine {
        self.transforms.last().copied().unwrap_or(Affine::IDENTITY)
    }
}

impl GraphicsContext for RecordingContext {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let rect = self.current().transform_rect_bbox(rect);
        self.ops.push(DrawOp::FillRect(rect, color));
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) {
        let rect = self.current().transform_rect_bbox(rect);
        self.ops.push(DrawOp::StrokeRect(rect, color, width));
    }

    fn draw_text(&mut self, text: &str, origin: Point, _font_size: f64, _color: Color) {
        let origin = self.current() * origin;
        self.ops.push(DrawOp::Text(text.to_owned(), origin));
    }

    fn measure_text(&mut self, text: &str, font_size: f64) -> Size {
        Size::new(
            text.chars().count() as f64 * font_size * 0.6,
            font_size * 1.2,
        )
    }

    fn push_clip(&mut self, rect: Rect) {
        self.clips.push(self.current().transform_rect_bbox(rect));
    }

    fn pop_clip(&mut self) {
        self.clips.pop();
    }

    fn push_transform(&mut self, transform: Affine) {
        let combined = self.current() * transform;
        self.transforms.push(combined);
    }

    fn pop_transform(&mut self) {
        self.transforms.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    #[test]
    fn headless_show_assigns_a_stable_handle() {
        let backend = HeadlessBackend::default();
        let options = WindowOptions {
            title: "demo".into(),
            initial_size: Some(Size::new(320.0, 200.0)),
        };
        let first = backend.show(&options);
        backend.hide();
        assert!(!backend.is_visible());
        assert_eq!(backend.show(&options), first);
        assert_eq!(backend.title(), "demo");
        assert_eq!(backend.client_size(), Size::new(320.0, 200.0));
        backend.close();
        assert!(backend.is_closed());
    }

    #[test]
    fn headless_coordinate_conversion() {
        let backend = HeadlessBackend::default();
        backend.set_position(Point::new(100.0, 50.0));
        let p = Point::new(3.0, 4.0);
        assert_eq!(backend.client_to_screen(p), Point::new(103.0, 54.0));
        assert_eq!(backend.screen_to_client(backend.client_to_screen(p)), p);
    }

    #[test]
    fn recording_context_applies_transforms() {
        let mut gfx = RecordingContext::new();
        gfx.push_transform(Affine::translate(Vec2::new(10.0, 20.0)));
        gfx.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Color::BLACK);
        gfx.pop_transform();
        gfx.draw_text("hi", Point::ZERO, 10.0, Color::WHITE);
        assert_eq!(
            gfx.ops(),
            [
                DrawOp::FillRect(Rect::new(10.0, 20.0, 15.0, 25.0), Color::BLACK),
                DrawOp::Text("hi".into(), Point::ZERO),
            ]
        );
        assert_eq!(gfx.measure_text("abc", 10.0), Size::new(18.0, 12.0));
    }
}
