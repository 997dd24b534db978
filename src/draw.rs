// Window + software drawing utilities.
// Visual effects provided here:
// 1) A window that shows the composited surface (camera + rectangle outlines).
// 2) Rectangle outlines stroked on top of the video.
// 3) A tiny 5x7 bitmap font to render HUD text on top of the video.

use crate::error::Error;
use crate::interaction::PointerEvent;
use crate::types::{FrameBuffer, Point, Rect};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

pub struct Drawer {
    window: Window,       // the on-screen window you see
    was_down: bool,       // left button state at the previous poll
    last_pos: Option<(f32, f32)>,
}

impl Drawer {
    /// Create a window sized to the requested camera feed.
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize, refresh_rate: usize) -> Result<Self, Error> {
        let options = WindowOptions { resize: true, ..WindowOptions::default() };
        let mut window = Window::new(title, width, height, options)
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        // Paces `update_with_buffer`; one present == one display refresh.
        window.set_target_fps(refresh_rate);
        Ok(Self { window, was_down: false, last_pos: None })
    }

    /// Push the pixels for this frame to the screen.
    /// Visual: the window immediately displays the new image (live video).
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// True while ESC is held down (we’ll exit when this is pressed).
    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    fn pressed_once(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// S: start capture.
    pub fn s_pressed_once(&self) -> bool {
        self.pressed_once(Key::S)
    }

    /// X: stop capture (the last frame stays on screen).
    pub fn x_pressed_once(&self) -> bool {
        self.pressed_once(Key::X)
    }

    /// Space: flip capture on/off.
    pub fn space_pressed_once(&self) -> bool {
        self.pressed_once(Key::Space)
    }

    /// D: switch between edit and draw tools.
    pub fn d_pressed_once(&self) -> bool {
        self.pressed_once(Key::D)
    }

    /// C: remove every rectangle.
    pub fn c_pressed_once(&self) -> bool {
        self.pressed_once(Key::C)
    }

    /// Turn polled mouse state into pointer events, in surface coordinates.
    /// `surface` is the size of the buffer currently being presented.
    pub fn pointer_events(&mut self, surface: (usize, usize)) -> Vec<PointerEvent> {
        let down = self.window.get_mouse_down(MouseButton::Left);
        let pos = self.window.get_mouse_pos(MouseMode::Clamp);
        let window_size = self.window.get_size();
        let point = pos.map(|(x, y)| to_surface(x, y, window_size, surface));

        let events = pointer_transitions(self.was_down, down, self.last_pos != pos, point);
        self.was_down = down;
        self.last_pos = pos;
        events
    }
}

/// Scale a window position into surface space (the window may be resized).
fn to_surface(x: f32, y: f32, window: (usize, usize), surface: (usize, usize)) -> Point {
    let sx = if window.0 > 0 { surface.0 as f32 / window.0 as f32 } else { 1.0 };
    let sy = if window.1 > 0 { surface.1 as f32 / window.1 as f32 } else { 1.0 };
    Point::new(x.max(0.0) * sx, y.max(0.0) * sy)
}

/// Edge-detect one poll of the left button.
fn pointer_transitions(was_down: bool, down: bool, moved: bool, point: Option<Point>) -> Vec<PointerEvent> {
    let mut events = Vec::new();
    match (was_down, down, point) {
        (false, true, Some(p)) => events.push(PointerEvent::Down(p)),
        (true, true, Some(p)) if moved => events.push(PointerEvent::Move(p)),
        (true, false, p) => {
            if let (Some(p), true) = (p, moved) {
                events.push(PointerEvent::Move(p));
            }
            events.push(PointerEvent::Up);
        }
        _ => {}
    }
    events
}

/* ---------- Software drawing: pixels, lines, rectangle outline, tiny bitmap font ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
/// Visual: the exact pixel at (x,y) changes color.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
/// Visual: a straight 1-pixel line appears on top of the camera image.
fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// Stroke the outline of `rect`, growing `thickness` pixels inward.
/// Visual: a hollow box appears over the video; negative extents draw the same box.
pub fn stroke_rect(fb: &mut FrameBuffer, rect: Rect, color: u32, thickness: u32) {
    let r = rect.normalized();
    let (left, top) = (r.x.round() as i32, r.y.round() as i32);
    let (right, bottom) = (r.right().round() as i32, r.bottom().round() as i32);

    for t in 0..thickness.max(1) as i32 {
        let (l, tp, rt, b) = (left + t, top + t, right - t, bottom - t);
        if l > rt || tp > b { break; }
        draw_line(fb, l, tp, rt, tp, color);  // top
        draw_line(fb, l, b, rt, b, color);    // bottom
        draw_line(fb, l, tp, l, b, color);    // left
        draw_line(fb, rt, tp, rt, b, color);  // right
    }
}

/* ---------- 5x7 bitmap font (ASCII subset for "LIVE | DRAW | RECTS: 1 | FPS: 30.0") ---------- */

/// Return a 5x7 glyph bitmap for a limited character set.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    // Helper macro to define a glyph quickly
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch {
        // Digits 0..9
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        // Uppercase letters used by the HUD
        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),

        // Punctuation: space, vertical bar, colon, dot
        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y).
/// Visual: a tiny glyph appears with a 1-pixel black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    let Some(rows) = glyph5x7(ch) else { return };
    // Shadow first (offset by 1,1), then the glyph itself.
    for (dx, dy, c) in [(1, 1, 0x00000000), (0, 0, color)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    put_pixel(fb, x + rx + dx, y + ry as i32 + dy, c);
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs.
/// Visual: a compact HUD string appears; each glyph is 5x7 with 1-pixel spacing.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += 6; // 5 pixels glyph width + 1 pixel spacing
    }
}
