#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Multiplies every channel by `factor` (expected in `0.0..=1.0`).
    pub fn shade(self, factor: f32) -> Self {
        let scale = |c: u8| (c as f32 * factor).round().clamp(0.0, 255.0) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }
}

/// Axis-aligned rectangle in pixels; `w`/`h` of zero or less is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    #[cfg(test)]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(x, y, self.right().max(other.right()) - x, self.bottom().max(other.bottom()) - y)
    }

    /// Intersection with `[0, width) x [0, height)`.
    pub fn clip(&self, width: u32, height: u32) -> Option<Rect> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(width as i32);
        let y1 = self.bottom().min(height as i32);
        let clipped = Rect::new(x0, y0, x1 - x0, y1 - y0);
        (!clipped.is_empty()).then_some(clipped)
    }
}

/// Pixel-addressable screen the terrain is drawn onto.
pub trait Surface {
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb);
    /// Makes `region` visible after drawing into it.
    fn present(&mut self, region: Rect);
}

/// In-memory RGBA surface, laid out the way ffmpeg's `rawvideo rgba` expects.
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    dirty: Option<Rect>,
    presented: u64,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self {
            width,
            height,
            pixels,
            dirty: None,
            presented: 0,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        Some(Rgb::new(self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]))
    }

    /// Region drawn since the last `present`.
    #[cfg(test)]
    pub fn dirty(&self) -> Option<Rect> {
        self.dirty
    }

    /// Number of `present` calls so far.
    #[cfg(test)]
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Surface for FrameBuffer {
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
        let Some(rect) = Rect::new(x, y, w, h).clip(self.width, self.height) else {
            return;
        };
        for row in rect.y..rect.bottom() {
            let start = ((row as u32 * self.width + rect.x as u32) * 4) as usize;
            let end = start + rect.w as usize * 4;
            for px in self.pixels[start..end].chunks_exact_mut(4) {
                px[0] = color.r;
                px[1] = color.g;
                px[2] = color.b;
                px[3] = 255;
            }
        }
        self.dirty = Some(self.dirty.map_or(rect, |d| d.union(&rect)));
    }

    fn present(&mut self, region: Rect) {
        self.presented += 1;
        log::trace!("Present #{} {:?} (dirty {:?})", self.presented, region, self.dirty);
        self.dirty = None;
    }
}
