//! SVG lowering for [`Shape`] lists.

use egui::{Color32, Pos2, Vec2};
use svg::{
    Document, Node,
    node::element::{Circle, Line, Path, Text, path::Data},
};

use crate::shape::{Shape, Shapes, TEXT_SIZE};

const OUTLINE_WIDTH: f32 = 3.0;
const DASH_ARRAY: &str = "2,3";

fn color(color: Color32) -> String {
    if color.a() == 0 {
        "none".to_owned()
    } else {
        format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
    }
}

impl Shape {
    pub(crate) fn to_svg(&self) -> Box<dyn Node> {
        match self {
            Self::Line {
                start,
                end,
                stroke,
                dotted,
            } => {
                let mut line = Line::new()
                    .set("x1", start.x)
                    .set("y1", start.y)
                    .set("x2", end.x)
                    .set("y2", end.y)
                    .set("stroke", color(stroke.color))
                    .set("stroke-width", stroke.width);
                if *dotted {
                    line = line.set("stroke-dasharray", DASH_ARRAY);
                }
                Box::new(line)
            }
            Self::CubicBezier { points, stroke } => {
                let data = Data::new()
                    .move_to((points[0].x, points[0].y))
                    .cubic_curve_to((
                        points[1].x,
                        points[1].y,
                        points[2].x,
                        points[2].y,
                        points[3].x,
                        points[3].y,
                    ));
                Box::new(
                    Path::new()
                        .set("d", data)
                        .set("fill", "none")
                        .set("stroke", color(stroke.color))
                        .set("stroke-width", stroke.width),
                )
            }
            Self::Circle {
                center,
                radius,
                fill,
                stroke,
            } => {
                let mut circle = Circle::new()
                    .set("cx", center.x)
                    .set("cy", center.y)
                    .set("r", *radius)
                    .set("fill", color(*fill));
                if let Some(stroke) = stroke {
                    circle = circle
                        .set("stroke", color(stroke.color))
                        .set("stroke-width", stroke.width);
                }
                Box::new(circle)
            }
            Self::Pie {
                center,
                radius,
                start_angle,
                span,
                fill,
            } => {
                let start = arc_point(*center, *radius, *start_angle);
                let end = arc_point(*center, *radius, start_angle + span);
                let large_arc = i32::from(*span > std::f32::consts::PI);
                let data = Data::new()
                    .move_to((center.x, center.y))
                    .line_to((start.x, start.y))
                    .elliptical_arc_to((*radius, *radius, 0, large_arc, 1, end.x, end.y))
                    .close();
                Box::new(Path::new().set("d", data).set("fill", color(*fill)))
            }
            Self::Text {
                text,
                center,
                color: text_color,
                outline,
            } => {
                // `Text::new` XML-escapes the content itself.
                let mut element = Text::new(text.clone())
                    .set("x", center.x)
                    .set("y", center.y)
                    .set("font-size", TEXT_SIZE)
                    .set("font-family", "Arial")
                    .set("text-anchor", "middle")
                    .set("dominant-baseline", "middle")
                    .set("fill", color(*text_color));
                if let Some(outline) = outline {
                    // Behind-stroke so the glyph interior keeps its fill.
                    element = element
                        .set("stroke", color(*outline))
                        .set("stroke-width", OUTLINE_WIDTH)
                        .set("paint-order", "stroke");
                }
                Box::new(element)
            }
        }
    }
}

fn arc_point(center: Pos2, radius: f32, angle: f32) -> Pos2 {
    center + radius * Vec2::angled(angle)
}

impl Shapes {
    /// Assembles a document with a `0 0 w h` viewbox; the shapes are
    /// expected to already sit in viewbox coordinates.
    #[must_use]
    pub fn to_svg(&self, viewbox: Vec2) -> Document {
        let mut document = Document::new()
            .set("width", viewbox.x)
            .set("height", viewbox.y)
            .set("viewBox", (0.0, 0.0, viewbox.x, viewbox.y));
        for shape in &self.shapes {
            document = document.add(shape.to_svg());
        }
        document
    }
}

#[cfg(test)]
mod tests {
    use egui::{Stroke, pos2, vec2};

    use super::*;

    #[test]
    fn dotted_lines_carry_a_dash_array() {
        let solid = Shape::Line {
            start: pos2(0.0, 0.0),
            end: pos2(10.0, 0.0),
            stroke: Stroke::new(2.0, Color32::BLACK),
            dotted: false,
        };
        assert!(!solid.to_svg().to_string().contains("stroke-dasharray"));

        let dotted = Shape::Line {
            start: pos2(0.0, 0.0),
            end: pos2(10.0, 0.0),
            stroke: Stroke::new(2.0, Color32::BLACK),
            dotted: true,
        };
        assert!(dotted.to_svg().to_string().contains("stroke-dasharray"));
    }

    #[test]
    fn outlined_text_paints_the_stroke_behind() {
        let text = Shape::Text {
            text: "2".to_owned(),
            center: pos2(0.0, 0.0),
            color: Color32::BLACK,
            outline: Some(Color32::WHITE),
        };
        let rendered = text.to_svg().to_string();
        assert!(rendered.contains("paint-order"));
        assert!(rendered.contains("#ffffff"));
    }

    #[test]
    fn text_content_is_escaped() {
        let text = Shape::Text {
            text: "a<b & c".to_owned(),
            center: pos2(0.0, 0.0),
            color: Color32::BLACK,
            outline: None,
        };
        let rendered = text.to_svg().to_string();
        assert!(rendered.contains("a&lt;b &amp; c"));
        assert!(!rendered.contains("&amp;lt;"));
    }

    #[test]
    fn transparent_fills_render_as_none() {
        let circle = Shape::Circle {
            center: pos2(0.0, 0.0),
            radius: 5.0,
            fill: Color32::TRANSPARENT,
            stroke: Some(Stroke::new(1.0, Color32::BLACK)),
        };
        let rendered = circle.to_svg().to_string();
        assert!(rendered.contains("fill=\"none\""));
    }

    #[test]
    fn documents_carry_the_requested_viewbox() {
        let document = Shapes::new(Vec::new()).to_svg(vec2(200.0, 200.0));
        let rendered = document.to_string();
        assert!(rendered.contains("viewBox"));
        assert!(rendered.contains("200"));
    }
}
