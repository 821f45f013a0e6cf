//! Viewport management and export surfaces.
//!
//! A [`View`] maps a region of the scene onto a drawing target. Interactive
//! rendering goes through [`View::render`] with whatever surface the
//! embedding provides; the export helpers produce an SVG document, a raster
//! description, or a paged layout from the same shape stream.

use egui::{Color32, Pos2, Rect, Vec2, emath::RectTransform, vec2};
use hapnet_core::scene::GraphicsScene;
use svg::Document;
use thiserror::Error;
use tracing::debug;

use crate::{
    render::generate_shapes,
    shape::{Shape, Shapes},
};

/// Multiplier applied per zoom step.
pub const ZOOM_FACTOR: f32 = 1.25;

/// Side length of exported SVG documents, in user units.
pub const SVG_SIZE: Vec2 = vec2(200.0, 200.0);

/// Pixel dimensions of raster exports.
pub const RASTER_SIZE: Vec2 = vec2(400.0, 400.0);

/// Padding around the content bounds when no viewport is pinned.
const FIT_MARGIN: f32 = 10.0;

#[derive(Debug, Error, PartialEq)]
pub enum SurfaceError {
    #[error("page size {width}x{height} must be positive in both dimensions")]
    InvalidPageSize { width: f32, height: f32 },
}

/// Anything that can receive transformed shapes.
pub trait RenderSurface {
    fn draw(&mut self, shape: Shape);
}

/// A window onto the scene.
///
/// With no pinned viewport the view fits the content bounds, so exports of a
/// freshly laid-out network frame it automatically.
#[derive(Debug, Clone)]
pub struct View {
    viewport: Option<Rect>,
    zoom: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            viewport: None,
            zoom: 1.0,
        }
    }
}

impl View {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the visible region, in scene coordinates.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = Some(viewport);
    }

    /// Returns to fitting the content bounds.
    pub fn fit_content(&mut self) {
        self.viewport = None;
        self.zoom = 1.0;
    }

    /// Shifts a pinned viewport in scene coordinates. A fitting view
    /// has no fixed origin to shift, so pans are ignored until a
    /// viewport is pinned.
    pub fn pan(&mut self, delta: Vec2) {
        if let Some(viewport) = &mut self.viewport {
            *viewport = viewport.translate(delta);
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom *= ZOOM_FACTOR;
    }

    pub fn zoom_out(&mut self) {
        self.zoom /= ZOOM_FACTOR;
    }

    #[must_use]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// The scene region currently mapped onto the target.
    fn region(&self, shapes: &Shapes) -> Rect {
        let base = self.viewport.unwrap_or_else(|| {
            if shapes.bounds.is_positive() {
                shapes.bounds.expand(FIT_MARGIN)
            } else {
                Rect::from_center_size(Pos2::ZERO, Vec2::splat(1.0))
            }
        });
        Rect::from_center_size(base.center(), base.size() / self.zoom)
    }

    /// Draws the scene onto `surface`, mapped to `target`.
    ///
    /// Transient pointer state is dropped first so a press in flight never
    /// leaks highlight strokes into an export.
    pub fn render(
        &self,
        scene: &mut GraphicsScene,
        surface: &mut impl RenderSurface,
        target: Rect,
    ) {
        scene.clear_transient();
        let shapes = generate_shapes(&scene.read());
        let region = self.region(&shapes);
        draw_into(shapes, region, target, surface);
    }

    #[must_use]
    pub fn export_svg(&self, scene: &mut GraphicsScene) -> Document {
        debug!("exporting svg document");
        let mut surface = SvgSurface::new(SVG_SIZE);
        self.render(scene, &mut surface, Rect::from_min_size(Pos2::ZERO, SVG_SIZE));
        surface.into_document()
    }

    #[must_use]
    pub fn export_raster(&self, scene: &mut GraphicsScene) -> RasterSurface {
        let mut surface = RasterSurface::new(RASTER_SIZE, Color32::WHITE);
        self.render(
            scene,
            &mut surface,
            Rect::from_min_size(Pos2::ZERO, RASTER_SIZE),
        );
        surface
    }

    /// Splits the scene across pages of the given size, scaled so the
    /// content width fills the page width.
    pub fn export_paged(
        &self,
        scene: &mut GraphicsScene,
        page: Vec2,
    ) -> Result<PagedSurface, SurfaceError> {
        if !(page.x > 0.0 && page.y > 0.0) {
            return Err(SurfaceError::InvalidPageSize {
                width: page.x,
                height: page.y,
            });
        }
        scene.clear_transient();
        let shapes = generate_shapes(&scene.read());
        let region = self.region(&shapes);
        let height = region.height() * page.x / region.width();
        let target = Rect::from_min_size(Pos2::ZERO, vec2(page.x, height));
        let mut surface = PagedSurface::new(page, height);
        draw_into(shapes, region, target, &mut surface);
        debug!(pages = surface.pages.len(), "exported paged layout");
        Ok(surface)
    }
}

fn draw_into(shapes: Shapes, region: Rect, target: Rect, surface: &mut impl RenderSurface) {
    let transform = RectTransform::from_to(region, target);
    for mut shape in shapes.shapes {
        shape.apply_transform(&transform);
        surface.draw(shape);
    }
}

/// Accumulates shapes for an SVG document.
pub struct SvgSurface {
    size: Vec2,
    shapes: Vec<Shape>,
}

impl SvgSurface {
    #[must_use]
    pub fn new(size: Vec2) -> Self {
        Self {
            size,
            shapes: Vec::new(),
        }
    }

    #[must_use]
    pub fn into_document(self) -> Document {
        Shapes::new(self.shapes).to_svg(self.size)
    }
}

impl RenderSurface for SvgSurface {
    fn draw(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }
}

/// A flat shape list ready for rasterisation by the embedding.
pub struct RasterSurface {
    size: Vec2,
    background: Color32,
    shapes: Vec<Shape>,
}

impl RasterSurface {
    #[must_use]
    pub fn new(size: Vec2, background: Color32) -> Self {
        Self {
            size,
            background,
            shapes: Vec::new(),
        }
    }

    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    #[must_use]
    pub fn background(&self) -> Color32 {
        self.background
    }

    #[must_use]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }
}

impl RenderSurface for RasterSurface {
    fn draw(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }
}

/// Shapes bucketed into fixed-size pages stacked down the y axis.
///
/// A shape straddling a page break lands on every page it touches,
/// translated into that page's local coordinates.
pub struct PagedSurface {
    page: Vec2,
    pages: Vec<Vec<Shape>>,
}

impl PagedSurface {
    fn new(page: Vec2, content_height: f32) -> Self {
        let count = (content_height / page.y).ceil().max(1.0) as usize;
        Self {
            page,
            pages: vec![Vec::new(); count],
        }
    }

    #[must_use]
    pub fn page_size(&self) -> Vec2 {
        self.page
    }

    #[must_use]
    pub fn pages(&self) -> &[Vec<Shape>] {
        &self.pages
    }
}

impl RenderSurface for PagedSurface {
    fn draw(&mut self, shape: Shape) {
        let bounds = shape.bounding_box();
        for (index, page) in self.pages.iter_mut().enumerate() {
            let top = index as f32 * self.page.y;
            let bottom = top + self.page.y;
            if bounds.max.y >= top && bounds.min.y <= bottom {
                let mut local = shape.clone();
                local.translate(vec2(0.0, -top));
                page.push(local);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_steps_accumulate_and_reset() {
        let mut view = View::new();
        view.zoom_in();
        view.zoom_in();
        view.zoom_out();
        assert!((view.zoom() - ZOOM_FACTOR).abs() < 1e-6);
        view.fit_content();
        assert_eq!(view.zoom(), 1.0);
    }

    #[test]
    fn straddling_shapes_land_on_both_pages() {
        let mut surface = PagedSurface::new(vec2(100.0, 50.0), 100.0);
        surface.draw(Shape::Circle {
            center: egui::pos2(50.0, 50.0),
            radius: 10.0,
            fill: Color32::BLACK,
            stroke: None,
        });
        assert_eq!(surface.pages().len(), 2);
        assert_eq!(surface.pages()[0].len(), 1);
        assert_eq!(surface.pages()[1].len(), 1);

        // Page-local coordinates on the second page.
        let Shape::Circle { center, .. } = &surface.pages()[1][0] else {
            panic!("expected a circle");
        };
        assert_eq!(*center, egui::pos2(50.0, 0.0));
    }
}
