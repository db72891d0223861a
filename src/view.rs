//! Interactive plot session
//!
//! `PlotView` ties a viewport, a renderer and an output pixmap together and
//! drives them the way an event loop would: paint, scroll, repaint in
//! budgeted fragments until the frame is complete.

use crate::geometry::{LayerGeometryProvider, Rect, Viewport, ZoomLevel};
use crate::render::{PlotRenderer, RenderError, RenderResult};
use anyhow::{Result, anyhow};
use std::path::Path;
use tiny_skia::Pixmap;

/// Outcome of a progressive repaint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Number of time-constrained renders it took
    pub fragments: usize,
    pub result: RenderResult,
}

/// A view onto a dense model, with the caches and output image behind it
///
/// Generic over the geometry provider; the scrolling and zoom controls are
/// available when it is a [`Viewport`].
pub struct PlotView<V = Viewport> {
    viewport: V,
    renderer: PlotRenderer,
    target: Pixmap,
}

impl PlotView<Viewport> {
    /// Move the view by whole pixel columns (positive = later in time)
    pub fn scroll_by(&mut self, pixels: i32) {
        self.viewport.scroll_by_pixels(pixels);
    }

    pub fn zoom_to(&mut self, zoom: ZoomLevel) {
        self.viewport.set_zoom_level(zoom);
    }
}

impl<V: LayerGeometryProvider> PlotView<V> {
    pub fn new(viewport: V, renderer: PlotRenderer) -> Result<Self> {
        let (width, height) = (viewport.paint_width(), viewport.paint_height());
        let target = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("Invalid view size {}x{}", width, height))?;
        Ok(Self {
            viewport,
            renderer,
            target,
        })
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn target(&self) -> &Pixmap {
        &self.target
    }

    fn full_rect(&self) -> Rect {
        Rect::new(0, 0, self.target.width(), self.target.height())
    }

    /// Render the whole frame
    pub fn paint(&mut self) -> Result<RenderResult> {
        let rect = self.full_rect();
        let result = self.renderer.render(&self.viewport, &mut self.target, rect);
        self.recover(result)
    }

    /// Render as much of the frame as one time budget allows
    pub fn paint_fragment(&mut self) -> Result<RenderResult> {
        let rect = self.full_rect();
        let result = self
            .renderer
            .render_time_constrained(&self.viewport, &mut self.target, rect);
        self.recover(result)
    }

    /// Repeat budgeted renders until the frame is complete
    pub fn paint_progressive(&mut self) -> Result<Progress> {
        let full = self.full_rect();
        // every fragment adds at least one column
        let limit = full.width as usize + 1;

        let mut fragments = 0;
        while fragments < limit {
            let result = self.paint_fragment()?;
            fragments += 1;
            if result.rendered == full {
                return Ok(Progress { fragments, result });
            }
        }

        tracing::warn!(fragments, "progressive render stalled, finishing in one pass");
        let result = self.paint()?;
        Ok(Progress {
            fragments: fragments + 1,
            result,
        })
    }

    /// Fall back to a full render when the caches were found inconsistent
    fn recover(&mut self, result: Result<RenderResult, RenderError>) -> Result<RenderResult> {
        match result {
            Ok(result) => Ok(result),
            Err(RenderError::Cache(e)) => {
                tracing::warn!("render failed on cache error, repainting: {}", e);
                self.renderer.invalidate();
                let rect = self.full_rect();
                self.renderer
                    .render(&self.viewport, &mut self.target, rect)
                    .map_err(|e| anyhow!("Failed to repaint view: {}", e))
            }
            Err(e) => Err(anyhow!("Failed to render view: {}", e)),
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.target
            .save_png(path)
            .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, ValidInterval};
    use crate::geometry::ProviderId;
    use crate::model::{DenseModel, GridModel};
    use crate::render::{Parameters, Sources};
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    fn renderer(budget: Duration) -> PlotRenderer {
        let columns = (0..200)
            .map(|c| (0..32).map(|b| ((c + b) % 9) as f32 / 9.0).collect())
            .collect();
        let model: Rc<dyn DenseModel> = Rc::new(GridModel::from_columns(8, columns));
        let params = Parameters {
            time_budget: budget,
            min_columns: 1,
            ..Parameters::default()
        };
        PlotRenderer::new(Sources::new(model), params)
    }

    fn viewport() -> Viewport {
        let mut viewport = Viewport::new(30, 16, ZoomLevel::FramesPerPixel(8));
        viewport.set_start_frame(160);
        viewport
    }

    fn view(budget: Duration) -> PlotView {
        PlotView::new(viewport(), renderer(budget)).unwrap()
    }

    /// Geometry that reports half its width on one `paint_width` call
    struct GlitchingViewport {
        inner: Viewport,
        calls: Cell<usize>,
        glitch_on: usize,
    }

    impl GlitchingViewport {
        fn new(glitch_on: usize) -> Self {
            Self {
                inner: viewport(),
                calls: Cell::new(0),
                glitch_on,
            }
        }
    }

    impl LayerGeometryProvider for GlitchingViewport {
        fn id(&self) -> ProviderId {
            self.inner.id()
        }

        fn start_frame(&self) -> i64 {
            self.inner.start_frame()
        }

        fn zoom_level(&self) -> ZoomLevel {
            self.inner.zoom_level()
        }

        fn paint_width(&self) -> u32 {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if call == self.glitch_on {
                self.inner.paint_width() / 2
            } else {
                self.inner.paint_width()
            }
        }

        fn paint_height(&self) -> u32 {
            self.inner.paint_height()
        }
    }

    #[test]
    fn test_paint_fills_frame() {
        let mut view = view(Duration::ZERO);
        let result = view.paint().unwrap();
        assert_eq!(result.rendered, Rect::new(0, 0, 30, 16));
        assert!(result.range.is_set());
    }

    #[test]
    fn test_zero_budget_progressive_converges() {
        let mut progressive = view(Duration::ZERO);
        let progress = progressive.paint_progressive().unwrap();
        assert_eq!(progress.result.rendered, Rect::new(0, 0, 30, 16));
        assert!(progress.fragments > 1 && progress.fragments <= 31);

        let mut full = view(Duration::ZERO);
        full.paint().unwrap();
        assert_eq!(progressive.target().pixels(), full.target().pixels());
    }

    #[test]
    fn test_small_scroll_needs_few_fragments() {
        let mut view = view(Duration::ZERO);
        view.paint().unwrap();

        view.scroll_by(2);
        let progress = view.paint_progressive().unwrap();
        assert_eq!(progress.fragments, 2);
        assert_eq!(view.viewport().start_frame(), 176);
    }

    #[test]
    fn test_generous_budget_is_one_fragment() {
        let mut view = view(Duration::from_secs(60));
        view.paint().unwrap();
        view.scroll_by(-12);
        assert_eq!(view.paint_progressive().unwrap().fragments, 1);
    }

    #[test]
    fn test_zoom_repaints_from_scratch() {
        let mut view = view(Duration::ZERO);
        view.paint().unwrap();

        view.zoom_to(ZoomLevel::FramesPerPixel(4));
        let result = view.paint_fragment().unwrap();
        assert_eq!(result.rendered.width, 1);
        assert_eq!(view.viewport().zoom_level(), ZoomLevel::FramesPerPixel(4));
    }

    #[test]
    fn test_width_change_mid_render_is_cache_error() {
        // the third width query is the one the caches are sized from
        let glitching = GlitchingViewport::new(3);
        let mut renderer = renderer(Duration::ZERO);
        let mut target = Pixmap::new(30, 16).unwrap();

        let result = renderer.render(&glitching, &mut target, Rect::new(0, 0, 30, 16));
        assert_eq!(
            result,
            Err(RenderError::Cache(CacheError::ColumnOutOfRange {
                column: 15,
                width: 15
            }))
        );
        assert!(!renderer.pixel_cache().is_valid());
        assert!(!renderer.magnitude_cache().range_over(0, 15).unwrap().is_set());
    }

    #[test]
    fn test_cache_error_falls_back_to_full_repaint() {
        // one query for the target size, then the renderer's own queries
        let mut glitched = PlotView::new(GlitchingViewport::new(4), renderer(Duration::ZERO)).unwrap();

        let result = glitched.paint().unwrap();
        assert_eq!(result.rendered, Rect::new(0, 0, 30, 16));
        assert!(result.range.is_set());

        // both caches were rebuilt at the full width
        assert_eq!(glitched.renderer.pixel_cache().size(), (30, 16));
        assert_eq!(
            glitched.renderer.pixel_cache().valid_interval(),
            ValidInterval::new(0, 30)
        );
        assert_eq!(glitched.renderer.magnitude_cache().width(), 30);
        assert!(glitched.renderer.magnitude_cache().range_at(29).unwrap().is_set());

        let mut clean = view(Duration::ZERO);
        clean.paint().unwrap();
        assert_eq!(glitched.target().pixels(), clean.target().pixels());
    }

    #[test]
    fn test_missing_model_is_error() {
        let viewport = Viewport::new(10, 10, ZoomLevel::default());
        let renderer = PlotRenderer::new(Sources::default(), Parameters::default());
        let mut view = PlotView::new(viewport, renderer).unwrap();
        assert!(view.paint().is_err());
    }

    #[test]
    fn test_zero_size_view_is_error() {
        let viewport = Viewport::new(0, 10, ZoomLevel::default());
        let renderer = PlotRenderer::new(Sources::default(), Parameters::default());
        assert!(PlotView::new(viewport, renderer).is_err());
    }
}
