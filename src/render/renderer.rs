//! Incremental renderer over the pixel and magnitude caches

use super::column::ColumnSampler;
use super::{Parameters, RenderError, RenderResult, Sources};
use crate::cache::{MagnitudeRange, MagnitudeRangeCache, PixelImageCache};
use crate::geometry::{LayerGeometryProvider, Rect};
use crate::model::DenseModel;
use std::time::Instant;
use tiny_skia::{Pixmap, PremultipliedColorU8};

/// A run of columns to paint, in one direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PaintSpan {
    left: i32,
    width: usize,
    right_to_left: bool,
    /// Leading columns (in paint order) that are already valid
    overlap: usize,
}

/// Renders a dense model as a colour plot, reusing previously drawn columns
///
/// Calls must be strictly sequential; both caches are patched in place.
pub struct PlotRenderer {
    sources: Sources,
    params: Parameters,
    cache: PixelImageCache,
    mag_cache: MagnitudeRangeCache,
    /// Visible displacement of the last scroll that moved the content
    last_scroll: i64,
}

impl PlotRenderer {
    pub fn new(sources: Sources, params: Parameters) -> Self {
        Self {
            sources,
            params,
            cache: PixelImageCache::new(),
            mag_cache: MagnitudeRangeCache::new(0),
            last_scroll: 0,
        }
    }

    pub fn pixel_cache(&self) -> &PixelImageCache {
        &self.cache
    }

    pub fn magnitude_cache(&self) -> &MagnitudeRangeCache {
        &self.mag_cache
    }

    /// Discard everything cached
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
        self.mag_cache.invalidate();
    }

    /// Render the whole of `rect`, however long it takes
    ///
    /// `rect` is clipped to the view first: the returned `rendered` is always
    /// `rect` intersected with `(0, 0, paint_width, paint_height)`, so a
    /// request inside the view comes back unchanged and anything outside it is
    /// left out.
    pub fn render(
        &mut self,
        v: &dyn LayerGeometryProvider,
        target: &mut Pixmap,
        rect: Rect,
    ) -> Result<RenderResult, RenderError> {
        let result = self.render_inner(v, target, rect, false);
        if let Ok(result) = &result {
            if result.rendered != rect.intersect(&view_rect(v)) {
                tracing::warn!(
                    rendered = ?result.rendered,
                    requested = ?rect,
                    "failed to render entire rect without a time constraint"
                );
            }
        }
        result
    }

    /// Render as much of `rect` as the time budget allows
    ///
    /// `rect` is clipped to the view as in [`render`](Self::render). Always
    /// renders whole columns, starting next to what is already cached so
    /// the cached area stays contiguous. Repeating the call on an unchanged
    /// view converges on the full rect.
    pub fn render_time_constrained(
        &mut self,
        v: &dyn LayerGeometryProvider,
        target: &mut Pixmap,
        rect: Rect,
    ) -> Result<RenderResult, RenderError> {
        self.render_inner(v, target, rect, true)
    }

    /// Largest full-height area of the cache not yet covered by valid pixels
    ///
    /// Empty when everything is cached, or before anything has been rendered.
    pub fn largest_uncached_rect(&self) -> Rect {
        let (width, height) = self.cache.size();
        if width == 0 || height == 0 {
            return Rect::EMPTY;
        }

        let valid = self.cache.valid_interval();
        let left_area = Rect::new(0, 0, valid.left() as u32, height);
        let right_area = Rect::new(
            valid.right() as i32,
            0,
            width - valid.right() as u32,
            height,
        );

        let largest = if right_area.width > left_area.width {
            right_area
        } else {
            left_area
        };
        if largest.is_empty() {
            Rect::EMPTY
        } else {
            largest
        }
    }

    fn render_inner(
        &mut self,
        v: &dyn LayerGeometryProvider,
        target: &mut Pixmap,
        rect: Rect,
        time_constrained: bool,
    ) -> Result<RenderResult, RenderError> {
        let model = self.sources.model.clone().ok_or(RenderError::NoModel)?;
        if !model.is_ready() {
            return Err(RenderError::ModelNotReady {
                completion: model.completion(),
            });
        }
        let (width, height) = (v.paint_width(), v.paint_height());
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyViewport { width, height });
        }

        let rect = rect.intersect(&view_rect(v));
        if rect.is_empty() {
            return Ok(RenderResult {
                rendered: Rect::EMPTY,
                range: MagnitudeRange::default(),
            });
        }

        let result = self.update(v, model.as_ref(), target, rect, time_constrained);
        if let Err(RenderError::Cache(e)) = &result {
            tracing::warn!("cache contract violated, discarding cache: {}", e);
            self.invalidate();
        }
        result
    }

    fn update(
        &mut self,
        v: &dyn LayerGeometryProvider,
        model: &dyn DenseModel,
        target: &mut Pixmap,
        rect: Rect,
        time_constrained: bool,
    ) -> Result<RenderResult, RenderError> {
        self.align_caches(v)?;

        let spans = self.plan(v, rect, time_constrained);
        let deadline = time_constrained.then(|| Instant::now() + self.params.time_budget);
        let started = Instant::now();

        let mut new_columns = 0;
        for span in &spans {
            let painted = self.paint_span(v, model, span, deadline, &mut new_columns)?;
            if painted < span.width {
                break;
            }
        }

        let rendered = self.cache.valid_area().intersect(&rect);
        self.compose(target, rendered);

        let range = if rendered.is_empty() {
            MagnitudeRange::default()
        } else {
            self.mag_cache.range_over(rendered.x, rendered.width as usize)?
        };

        tracing::trace!(
            spans = spans.len(),
            new_columns,
            elapsed_us = started.elapsed().as_micros() as u64,
            ?rendered,
            "render pass"
        );

        Ok(RenderResult { rendered, range })
    }

    /// Bring both caches in line with the view's size, zoom and position
    ///
    /// A zoom change invalidates before the scroll is considered.
    fn align_caches(&mut self, v: &dyn LayerGeometryProvider) -> Result<(), RenderError> {
        let size = (v.paint_width(), v.paint_height());
        if self.cache.size() != size {
            tracing::debug!(width = size.0, height = size.1, "resizing caches");
            self.cache.resize(size.0, size.1);
            self.mag_cache.resize(size.0 as usize);
        }

        self.cache.set_provider(v.id());
        self.mag_cache.set_provider(v.id());
        self.cache.set_zoom_level(v.zoom_level());
        self.mag_cache.set_zoom_level(v.zoom_level());

        let new_start = v.start_frame();
        let dx = v.x_for_frame(self.cache.start_frame()) as i64 - v.x_for_frame(new_start) as i64;
        if dx != 0 {
            self.last_scroll = dx;
        }

        self.cache.scroll_to(v, new_start)?;
        self.mag_cache.scroll_to(v, new_start)?;
        Ok(())
    }

    /// Spans still to paint for `rect`, in paint order
    fn plan(&self, v: &dyn LayerGeometryProvider, rect: Rect, time_constrained: bool) -> Vec<PaintSpan> {
        let (x0, x1) = (rect.x, rect.right());

        if !self.cache.is_valid() {
            if time_constrained && x0 == 0 && x1 == v.paint_width() as i32 {
                // start near the region of interest, then fill leftwards
                let middle = x0 + ((x1 - x0) as f32 * self.params.middle_start_fraction) as i32;
                if middle > x0 && middle < x1 {
                    return vec![
                        PaintSpan {
                            left: middle,
                            width: (x1 - middle) as usize,
                            right_to_left: false,
                            overlap: 0,
                        },
                        PaintSpan {
                            left: x0,
                            width: (middle + 1 - x0) as usize,
                            right_to_left: true,
                            overlap: 1,
                        },
                    ];
                }
            }
            return vec![PaintSpan {
                left: x0,
                width: (x1 - x0) as usize,
                right_to_left: false,
                overlap: 0,
            }];
        }

        let valid = self.cache.valid_interval();
        let (valid_left, valid_right) = (valid.left() as i32, valid.right() as i32);
        let requests = if x0 < valid_left && x1 > valid_right {
            vec![
                (x0, (valid_left - x0) as usize),
                (valid_right, (x1 - valid_right) as usize),
            ]
        } else {
            vec![(x0, (x1 - x0) as usize)]
        };

        let mut spans: Vec<PaintSpan> = requests
            .into_iter()
            .filter_map(|(left, width)| {
                let (left, width, is_left) = self.cache.adjust_to_touch_valid_area(left, width);
                (width > 0).then_some(PaintSpan {
                    left,
                    width,
                    right_to_left: is_left,
                    overlap: 1,
                })
            })
            .collect();

        // content moving right reveals the left edge first, and vice versa
        if self.last_scroll > 0 {
            spans.sort_by_key(|span| !span.right_to_left);
        } else {
            spans.sort_by_key(|span| span.right_to_left);
        }
        spans
    }

    /// Paint one span into the caches; returns the number of columns painted
    fn paint_span(
        &mut self,
        v: &dyn LayerGeometryProvider,
        model: &dyn DenseModel,
        span: &PaintSpan,
        deadline: Option<Instant>,
        new_columns: &mut usize,
    ) -> Result<usize, RenderError> {
        let height = self.cache.height();
        let Some(mut buffer) = Pixmap::new(span.width as u32, height) else {
            return Ok(span.width);
        };

        let mut sampler = ColumnSampler::new(model, &self.params, height as usize);
        let colour_scale = self.params.colour_scale;
        let mut values = vec![0.0; height as usize];

        let mut painted = 0;
        while painted < span.width {
            let offset = if span.right_to_left {
                span.width - 1 - painted
            } else {
                painted
            };
            let x = span.left + offset as i32;

            let range = sampler.sample(v, x, &mut values);
            let pixels = buffer.pixels_mut();
            for (row, value) in values.iter().enumerate() {
                pixels[row * span.width + offset] = match range {
                    Some(_) => colour_scale.pixel(*value),
                    None => PremultipliedColorU8::TRANSPARENT,
                };
            }
            if let Some(range) = range {
                self.mag_cache.sample_column(x, &range)?;
            }

            painted += 1;
            if painted <= span.overlap {
                continue;
            }
            *new_columns += 1;

            if let Some(deadline) = deadline {
                if *new_columns >= self.params.min_columns && Instant::now() >= deadline {
                    break;
                }
            }
        }

        let skipped = span.width - painted;
        let (left, source_left) = if span.right_to_left {
            (span.left + skipped as i32, skipped as i32)
        } else {
            (span.left, 0)
        };
        self.cache
            .draw_image(left, painted, &buffer, source_left, painted)?;

        Ok(painted)
    }

    /// Copy the cached pixels of `area` into the same place in `target`
    fn compose(&self, target: &mut Pixmap, area: Rect) {
        let Some(source) = self.cache.pixmap() else {
            return;
        };
        let bounds = Rect::new(0, 0, target.width(), target.height());
        let area = area.intersect(&bounds);
        if area.is_empty() {
            return;
        }

        let source_width = source.width() as usize;
        let target_width = target.width() as usize;
        let (left, right) = (area.x as usize, area.right() as usize);
        let src = source.pixels();
        let dst = target.pixels_mut();
        for y in area.y as usize..area.bottom() as usize {
            dst[y * target_width + left..y * target_width + right]
                .copy_from_slice(&src[y * source_width + left..y * source_width + right]);
        }
    }
}

fn view_rect(v: &dyn LayerGeometryProvider) -> Rect {
    Rect::new(0, 0, v.paint_width(), v.paint_height())
}
