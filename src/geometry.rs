//! Viewport geometry
//!
//! Maps between logical positions (audio frames) and pixel columns. The caches
//! only ever consult a geometry provider transiently, to work out how far the
//! content has moved since they were last populated.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a geometry provider
///
/// Caches remember the id of the provider they were populated for rather than
/// holding a reference to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderId(u64);

impl ProviderId {
    pub fn next() -> Self {
        Self(NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Horizontal scale of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomLevel {
    /// Zoomed out: each pixel column covers this many frames
    FramesPerPixel(u32),
    /// Zoomed in: each frame spans this many pixel columns
    PixelsPerFrame(u32),
}

impl ZoomLevel {
    /// Number of whole pixels covering `frames` (floor, also for negative input)
    pub fn frames_to_pixels(&self, frames: i64) -> i64 {
        match *self {
            ZoomLevel::FramesPerPixel(n) => frames.div_euclid(n.max(1) as i64),
            ZoomLevel::PixelsPerFrame(n) => frames * n.max(1) as i64,
        }
    }

    /// Number of frames covered by `pixels` columns (floor)
    pub fn pixels_to_frames(&self, pixels: i64) -> i64 {
        match *self {
            ZoomLevel::FramesPerPixel(n) => pixels * n.max(1) as i64,
            ZoomLevel::PixelsPerFrame(n) => pixels.div_euclid(n.max(1) as i64),
        }
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        ZoomLevel::FramesPerPixel(1)
    }
}

impl std::fmt::Display for ZoomLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoomLevel::FramesPerPixel(n) => write!(f, "{} frames/px", n),
            ZoomLevel::PixelsPerFrame(n) => write!(f, "{} px/frame", n),
        }
    }
}

/// Source of frame/pixel mapping for a view
pub trait LayerGeometryProvider {
    fn id(&self) -> ProviderId;

    /// Frame shown at pixel column 0
    fn start_frame(&self) -> i64;

    fn zoom_level(&self) -> ZoomLevel;

    fn paint_width(&self) -> u32;

    fn paint_height(&self) -> u32;

    /// Pixel column of `frame`, relative to the current start frame
    fn x_for_frame(&self, frame: i64) -> i32 {
        let pixels = self.zoom_level().frames_to_pixels(frame - self.start_frame());
        pixels.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    /// First frame covered by pixel column `x`
    fn frame_for_x(&self, x: i32) -> i64 {
        self.start_frame() + self.zoom_level().pixels_to_frames(x as i64)
    }
}

/// A scrollable window onto a timeline
#[derive(Debug, Clone)]
pub struct Viewport {
    id: ProviderId,
    start_frame: i64,
    zoom: ZoomLevel,
    width: u32,
    height: u32,
    /// Pixels scrolled that do not yet add up to a whole frame
    pending_pixels: i64,
}

impl Viewport {
    pub fn new(width: u32, height: u32, zoom: ZoomLevel) -> Self {
        Self {
            id: ProviderId::next(),
            start_frame: 0,
            zoom,
            width,
            height,
            pending_pixels: 0,
        }
    }

    pub fn set_start_frame(&mut self, frame: i64) {
        self.start_frame = frame;
        self.pending_pixels = 0;
    }

    /// Move the window by whole pixel columns (positive = later in time)
    ///
    /// When zoomed in past one pixel per frame the start frame only moves once
    /// the accumulated scroll covers a whole frame, in either direction.
    pub fn scroll_by_pixels(&mut self, pixels: i32) {
        match self.zoom {
            ZoomLevel::FramesPerPixel(_) => {
                self.start_frame += self.zoom.pixels_to_frames(pixels as i64);
            }
            ZoomLevel::PixelsPerFrame(n) => {
                let n = n.max(1) as i64;
                self.pending_pixels += pixels as i64;
                self.start_frame += self.pending_pixels / n;
                self.pending_pixels %= n;
            }
        }
    }

    pub fn set_zoom_level(&mut self, zoom: ZoomLevel) {
        self.zoom = zoom;
        self.pending_pixels = 0;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

impl LayerGeometryProvider for Viewport {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn start_frame(&self) -> i64 {
        self.start_frame
    }

    fn zoom_level(&self) -> ZoomLevel {
        self.zoom
    }

    fn paint_width(&self) -> u32 {
        self.width
    }

    fn paint_height(&self) -> u32 {
        self.height
    }
}

/// Integer rectangle that, unlike `tiny_skia::IntRect`, may be empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const EMPTY: Rect = Rect {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };

    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// One past the rightmost column
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return Rect::EMPTY;
        }
        Rect::new(left, top, (right - left) as u32, (bottom - top) as u32)
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }
}
