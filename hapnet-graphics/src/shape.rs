//! Concrete draw shapes, decoupled from the scene items so the same
//! list can feed egui, SVG, and raster destinations.

use std::f32::consts::PI;

use egui::{
    Align2, Color32, FontId, Pos2, Rect, Stroke, Vec2,
    emath::RectTransform,
    epaint::{CircleShape, CubicBezierShape},
    vec2,
};

pub const TEXT_SIZE: f32 = 16.0;
/// Average glyph width fraction used for text extents, matching the
/// label metrics of the core.
pub const GLYPH_ASPECT: f32 = 0.6;
const DASH_LENGTH: f32 = 2.0;
const GAP_LENGTH: f32 = 3.0;

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Line {
        start: Pos2,
        end: Pos2,
        stroke: Stroke,
        dotted: bool,
    },
    CubicBezier {
        points: [Pos2; 4],
        stroke: Stroke,
    },
    Circle {
        center: Pos2,
        radius: f32,
        fill: Color32,
        stroke: Option<Stroke>,
    },
    /// Disc sector, angles in radians with the positive direction
    /// clockwise on screen.
    Pie {
        center: Pos2,
        radius: f32,
        start_angle: f32,
        span: f32,
        fill: Color32,
    },
    Text {
        text: String,
        center: Pos2,
        color: Color32,
        /// Painted under the glyphs, behind-stroke style, so text stays
        /// readable over edges.
        outline: Option<Color32>,
    },
}

/// A full frame of shapes in draw order, with their united bounds in
/// the coordinate space they were generated in.
pub struct Shapes {
    pub shapes: Vec<Shape>,
    pub bounds: Rect,
}

impl Shapes {
    #[must_use]
    pub fn new(shapes: Vec<Shape>) -> Self {
        let bounds = shapes
            .iter()
            .fold(Rect::NOTHING, |acc, shape| acc.union(shape.bounding_box()));
        Self { shapes, bounds }
    }
}

impl Shape {
    pub fn apply_transform(&mut self, transform: &RectTransform) {
        match self {
            Shape::Line { start, end, .. } => {
                *start = transform.transform_pos(*start);
                *end = transform.transform_pos(*end);
            }
            Shape::CubicBezier { points, .. } => {
                for point in points {
                    *point = transform.transform_pos(*point);
                }
            }
            Shape::Circle { center, radius, .. } | Shape::Pie { center, radius, .. } => {
                *center = transform.transform_pos(*center);
                *radius *= transform.scale().min_elem();
            }
            Shape::Text { center, .. } => {
                *center = transform.transform_pos(*center);
            }
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            Shape::Line { start, end, .. } => {
                *start += delta;
                *end += delta;
            }
            Shape::CubicBezier { points, .. } => {
                for point in points {
                    *point += delta;
                }
            }
            Shape::Circle { center, .. }
            | Shape::Pie { center, .. }
            | Shape::Text { center, .. } => {
                *center += delta;
            }
        }
    }

    #[must_use]
    pub fn into_egui_shape(self, ui: &egui::Ui) -> egui::Shape {
        match self {
            Shape::Line {
                start,
                end,
                stroke,
                dotted,
            } => {
                if dotted {
                    egui::Shape::Vec(egui::Shape::dashed_line(
                        &[start, end],
                        stroke,
                        DASH_LENGTH,
                        GAP_LENGTH,
                    ))
                } else {
                    egui::Shape::line_segment([start, end], stroke)
                }
            }
            Shape::CubicBezier { points, stroke } => {
                egui::Shape::CubicBezier(CubicBezierShape::from_points_stroke(
                    points,
                    false,
                    Color32::TRANSPARENT,
                    stroke,
                ))
            }
            Shape::Circle {
                center,
                radius,
                fill,
                stroke,
            } => egui::Shape::Circle(CircleShape {
                center,
                radius,
                fill,
                stroke: stroke.unwrap_or(Stroke::NONE),
            }),
            Shape::Pie {
                center,
                radius,
                start_angle,
                span,
                fill,
            } => {
                // Sectors wider than a half turn are not convex; split.
                if span > PI {
                    let half = span / 2.0;
                    let first = Shape::Pie {
                        center,
                        radius,
                        start_angle,
                        span: half,
                        fill,
                    };
                    let second = Shape::Pie {
                        center,
                        radius,
                        start_angle: start_angle + half,
                        span: span - half,
                        fill,
                    };
                    egui::Shape::Vec(vec![
                        first.into_egui_shape(ui),
                        second.into_egui_shape(ui),
                    ])
                } else {
                    egui::Shape::convex_polygon(
                        pie_points(center, radius, start_angle, span),
                        fill,
                        Stroke::NONE,
                    )
                }
            }
            Shape::Text {
                text,
                center,
                color,
                ..
            } => ui.fonts(|fonts| {
                egui::Shape::text(
                    fonts,
                    center,
                    Align2::CENTER_CENTER,
                    text,
                    FontId::proportional(TEXT_SIZE),
                    color,
                )
            }),
        }
    }

    #[must_use]
    pub fn bounding_box(&self) -> Rect {
        match self {
            Shape::Line { start, end, .. } => Rect::from_two_pos(*start, *end),
            Shape::CubicBezier { points, .. } => Rect::from_points(points),
            Shape::Circle { center, radius, .. } | Shape::Pie { center, radius, .. } => {
                Rect::from_center_size(*center, Vec2::splat(*radius * 2.0))
            }
            Shape::Text { text, center, .. } => Rect::from_center_size(
                *center,
                vec2(text.chars().count() as f32 * TEXT_SIZE * GLYPH_ASPECT, TEXT_SIZE),
            ),
        }
    }
}

/// Fan of points covering a circle sector, centre first.
pub(crate) fn pie_points(center: Pos2, radius: f32, start_angle: f32, span: f32) -> Vec<Pos2> {
    let steps = (span / (PI / 36.0)).ceil().max(1.0) as usize;
    let mut points = vec![center];
    for step in 0..=steps {
        let angle = start_angle + span * step as f32 / steps as f32;
        points.push(center + radius * Vec2::angled(angle));
    }
    points
}

#[cfg(test)]
mod tests {
    use egui::pos2;

    use super::*;

    #[test]
    fn bounds_unite_all_shapes() {
        let shapes = Shapes::new(vec![
            Shape::Circle {
                center: pos2(0.0, 0.0),
                radius: 10.0,
                fill: Color32::BLACK,
                stroke: None,
            },
            Shape::Line {
                start: pos2(0.0, 0.0),
                end: pos2(100.0, 50.0),
                stroke: Stroke::new(2.0, Color32::BLACK),
                dotted: false,
            },
        ]);
        assert_eq!(shapes.bounds.min, pos2(-10.0, -10.0));
        assert_eq!(shapes.bounds.max, pos2(100.0, 50.0));
    }

    #[test]
    fn transform_scales_radii_by_the_smaller_axis() {
        let transform = RectTransform::from_to(
            Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0)),
            Rect::from_min_size(pos2(0.0, 0.0), vec2(200.0, 400.0)),
        );
        let mut shape = Shape::Circle {
            center: pos2(50.0, 50.0),
            radius: 10.0,
            fill: Color32::BLACK,
            stroke: None,
        };
        shape.apply_transform(&transform);
        let Shape::Circle { center, radius, .. } = shape else {
            unreachable!()
        };
        assert_eq!(center, pos2(100.0, 200.0));
        assert_eq!(radius, 20.0);
    }

    #[test]
    fn pie_fans_start_and_end_on_the_arc() {
        let points = pie_points(pos2(0.0, 0.0), 10.0, 0.0, PI / 2.0);
        assert_eq!(points[0], pos2(0.0, 0.0));
        let first = points[1];
        assert!((first.x - 10.0).abs() < 1e-4 && first.y.abs() < 1e-4);
        let last = points[points.len() - 1];
        assert!(last.x.abs() < 1e-4 && (last.y - 10.0).abs() < 1e-4);
    }
}
