//! Pixel backing store for a scrolling view

use super::{CacheError, ValidInterval};
use crate::geometry::{LayerGeometryProvider, ProviderId, Rect, ZoomLevel};
use tiny_skia::Pixmap;

/// Rendered pixels for the current viewport, with the run of columns that are
/// known to be correct
///
/// The cache remembers which provider and zoom level its content belongs to;
/// changing either throws the content away.
#[derive(Debug, Default)]
pub struct PixelImageCache {
    pixmap: Option<Pixmap>,
    valid: ValidInterval,
    start_frame: i64,
    zoom_level: Option<ZoomLevel>,
    provider: Option<ProviderId>,
}

impl PixelImageCache {
    /// Create an empty, zero-sized cache with no provider
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(provider: ProviderId) -> Self {
        Self {
            provider: Some(provider),
            ..Self::default()
        }
    }

    pub fn provider(&self) -> Option<ProviderId> {
        self.provider
    }

    /// Associate the cache with a provider, invalidating if it changes
    pub fn set_provider(&mut self, provider: ProviderId) {
        if self.provider != Some(provider) {
            self.provider = Some(provider);
            self.invalidate();
        }
    }

    pub fn zoom_level(&self) -> Option<ZoomLevel> {
        self.zoom_level
    }

    pub fn set_zoom_level(&mut self, zoom: ZoomLevel) {
        if self.zoom_level != Some(zoom) {
            self.zoom_level = Some(zoom);
            self.invalidate();
        }
    }

    pub fn start_frame(&self) -> i64 {
        self.start_frame
    }

    /// (width, height) of the backing store
    pub fn size(&self) -> (u32, u32) {
        self.pixmap
            .as_ref()
            .map(|p| (p.width(), p.height()))
            .unwrap_or((0, 0))
    }

    pub fn width(&self) -> usize {
        self.size().0 as usize
    }

    pub fn height(&self) -> u32 {
        self.size().1
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.valid.is_valid()
    }

    pub fn valid_interval(&self) -> ValidInterval {
        self.valid
    }

    pub fn invalidate(&mut self) {
        self.valid.invalidate();
    }

    /// Reallocate the backing store; the content is always discarded
    pub fn resize(&mut self, width: u32, height: u32) {
        self.pixmap = Pixmap::new(width, height);
        self.invalidate();
    }

    /// Valid columns across the full height
    pub fn valid_area(&self) -> Rect {
        if !self.valid.is_valid() {
            return Rect::EMPTY;
        }
        Rect::new(
            self.valid.left() as i32,
            0,
            self.valid.width() as u32,
            self.height(),
        )
    }

    /// Realign the content with a new start frame
    ///
    /// Pixel rows are moved in place by the visible displacement; columns that
    /// scroll in are left stale and outside the valid interval.
    pub fn scroll_to(
        &mut self,
        v: &dyn LayerGeometryProvider,
        new_start_frame: i64,
    ) -> Result<(), CacheError> {
        let Some(provider) = self.provider else {
            return Err(CacheError::NoGeometryProvider);
        };
        if provider != v.id() {
            tracing::debug!("pixel cache moved to a new geometry provider");
            self.set_provider(v.id());
        }

        let dx = v.x_for_frame(self.start_frame) as i64 - v.x_for_frame(new_start_frame) as i64;
        self.start_frame = new_start_frame;

        if dx == 0 || !self.is_valid() {
            return Ok(());
        }

        let width = self.width();
        if dx.unsigned_abs() >= width as u64 {
            tracing::trace!(dx, width, "scroll exceeds cache width, invalidating");
            self.invalidate();
            return Ok(());
        }

        if let Some(pixmap) = self.pixmap.as_mut() {
            shift_rows(pixmap, dx);
        }
        self.valid = self.valid.shifted(dx, width);
        tracing::trace!(dx, valid = ?self.valid, "pixel cache scrolled");

        Ok(())
    }

    /// Trim a requested paint span so that drawing it extends the valid area
    ///
    /// Returns `(left, width, is_left_of_valid_area)`. The adjusted span shares
    /// exactly one column with the valid interval unless the request already
    /// reaches past both of its edges. A request that is already valid comes
    /// back with zero width.
    pub fn adjust_to_touch_valid_area(&self, left: i32, width: usize) -> (i32, usize, bool) {
        if !self.is_valid() {
            return (left, width, false);
        }

        let valid_left = self.valid.left() as i32;
        let valid_right = self.valid.right() as i32;
        let right = left + width as i32;

        if left < valid_left {
            if right <= valid_right {
                (left, (valid_left + 1 - left) as usize, true)
            } else {
                (left, width, true)
            }
        } else if right <= valid_right {
            (left, 0, false)
        } else {
            let new_left = valid_right - 1;
            (new_left, (right - new_left) as usize, false)
        }
    }

    /// Copy columns `source_left..source_left + source_width` of `source` into
    /// `left..left + width`, over the full height
    ///
    /// When the widths differ the source is resampled to the nearest column.
    pub fn draw_image(
        &mut self,
        left: i32,
        width: usize,
        source: &Pixmap,
        source_left: i32,
        source_width: usize,
    ) -> Result<(), CacheError> {
        if width == 0 {
            return Ok(());
        }

        let total = self.width();
        if left < 0 || left as usize + width > total {
            return Err(CacheError::DrawOutOfBounds {
                left: left as i64,
                width,
                total,
            });
        }
        let Some(pixmap) = self.pixmap.as_mut() else {
            return Err(CacheError::DrawOutOfBounds {
                left: left as i64,
                width,
                total,
            });
        };
        if source.height() != pixmap.height() {
            return Err(CacheError::HeightMismatch {
                expected: pixmap.height(),
                actual: source.height(),
            });
        }
        let source_total = source.width() as usize;
        if source_left < 0 || source_width == 0 || source_left as usize + source_width > source_total {
            return Err(CacheError::SourceOutOfBounds {
                left: source_left as i64,
                width: source_width,
                total: source_total,
            });
        }

        let left = left as usize;
        let source_left = source_left as usize;
        let src = source.pixels();
        let dst = pixmap.pixels_mut();

        for y in 0..source.height() as usize {
            let src_row = &src[y * source_total..(y + 1) * source_total];
            let dst_row = &mut dst[y * total..(y + 1) * total];
            if source_width == width {
                dst_row[left..left + width]
                    .copy_from_slice(&src_row[source_left..source_left + width]);
            } else {
                for x in 0..width {
                    dst_row[left + x] = src_row[source_left + x * source_width / width];
                }
            }
        }

        self.valid.extend(left, width);
        Ok(())
    }
}

/// Move every row `dx` columns in place (positive = right)
fn shift_rows(pixmap: &mut Pixmap, dx: i64) {
    let width = pixmap.width() as usize;
    let shift = dx.unsigned_abs() as usize;
    if shift >= width {
        return;
    }
    let keep = width - shift;

    for row in pixmap.pixels_mut().chunks_exact_mut(width) {
        if dx < 0 {
            row.copy_within(shift.., 0);
        } else {
            row.copy_within(..keep, shift);
        }
    }
}
