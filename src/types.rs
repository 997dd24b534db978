// Core types shared by the render loop and the interaction state machine.

use std::ops::Sub;

/// A raster image. Used both for camera frames and for the drawing surface.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// A black buffer of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    /// Pack tightly laid out RGB8 bytes into 0x00RRGGBB pixels.
    /// Short input is padded with black so `pixels` always matches the dimensions.
    pub fn from_rgb8(width: usize, height: usize, rgb: &[u8]) -> Self {
        let mut pixels: Vec<u32> = rgb
            .chunks_exact(3)
            .take(width * height)
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
            .collect();
        pixels.resize(width * height, 0);
        Self { width, height, pixels }
    }

    /// Clear and draw `frame`: the surface takes on the frame's dimensions.
    /// Visual: the whole surface now shows the new camera image.
    pub fn draw_image(&mut self, frame: &FrameBuffer) {
        self.width = frame.width;
        self.height = frame.height;
        self.pixels.clear();
        self.pixels.extend_from_slice(&frame.pixels);
    }
}

/// A position in surface space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Stable identifier of a rectangle in the interaction's collection.
pub type RectId = u64;

/// Axis-aligned rectangle. Width/height may be negative while a draw is in progress.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Zero-sized rectangle anchored at `p`.
    pub const fn at(p: Point) -> Self {
        Self::new(p.x, p.y, 0.0, 0.0)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Same covered region with a top-left origin and non-negative extents.
    pub fn normalized(&self) -> Rect {
        Rect {
            x: self.x.min(self.x + self.width),
            y: self.y.min(self.y + self.height),
            width: self.width.abs(),
            height: self.height.abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Inclusive containment on the normalized form.
    pub fn contains(&self, p: Point) -> bool {
        let r = self.normalized();
        p.x >= r.x && p.x <= r.right() && p.y >= r.y && p.y <= r.bottom()
    }

    /// The resize handle: a `size`×`size` square inside the bottom-right corner.
    pub fn handle(&self, size: f32) -> Rect {
        let r = self.normalized();
        let w = size.min(r.width);
        let h = size.min(r.height);
        Rect::new(r.right() - w, r.bottom() - h, w, h)
    }
}
