//! Turns the scene's draw order into a [`Shapes`] frame, with hover
//! and press highlights baked in.

use std::f32::consts::{FRAC_PI_2, TAU};

use egui::{Color32, Stroke};
use hapnet_core::{
    items::{BEZIER_HANDLE_RADIUS, BezierCurve, Edge, Item, Label, Node, Vertex},
    scene::SceneState,
};
use itertools::Itertools;

use crate::shape::{Shape, Shapes};

pub const STROKE_WIDTH: f32 = 2.0;
pub const BORDER_WIDTH: f32 = 1.0;
const HIGHLIGHT_LINE_WIDTH: f32 = 6.0;
const HIGHLIGHT_BORDER_WIDTH: f32 = 4.0;
const BUBBLE_RADIUS: f32 = 2.5;
const HIGHLIGHT_BUBBLE_RADIUS: f32 = 6.0;
const BAR_HALF_LENGTH: f32 = 4.0;
/// Pies start at twelve o'clock.
const PIE_START_ANGLE: f32 = -FRAC_PI_2;

/// One frame of the scene in scene coordinates, bottom-most first.
#[must_use]
pub fn generate_shapes(state: &SceneState) -> Shapes {
    let nothing_grabbed = state.grabbed().is_none();
    let mut shapes = Vec::new();
    for (_, item) in state.iter() {
        match item {
            Item::Edge(edge) => edge_shapes(edge, &mut shapes),
            Item::Vertex(vertex) => vertex_shapes(vertex, nothing_grabbed, &mut shapes),
            Item::Node(node) => node_shapes(node, nothing_grabbed, &mut shapes),
            Item::Label(label) => label_shapes(label, nothing_grabbed, &mut shapes),
            Item::Bezier(bezier) => bezier_shapes(bezier, &mut shapes),
        }
    }
    Shapes::new(shapes)
}

fn border_stroke(vertex: &Vertex, nothing_grabbed: bool) -> Stroke {
    if vertex.pressed || (vertex.hovered && nothing_grabbed) {
        Stroke::new(HIGHLIGHT_BORDER_WIDTH, vertex.highlight_color)
    } else {
        Stroke::new(BORDER_WIDTH, Color32::BLACK)
    }
}

fn edge_shapes(edge: &Edge, out: &mut Vec<Shape>) {
    let Some((start, end)) = edge.line else { return };
    if edge.hovered {
        out.push(Shape::Line {
            start,
            end,
            stroke: Stroke::new(HIGHLIGHT_LINE_WIDTH, edge.highlight_color),
            dotted: false,
        });
    }
    let stroke = Stroke::new(STROKE_WIDTH, Color32::BLACK);
    out.push(Shape::Line {
        start,
        end,
        stroke,
        dotted: edge.style.has_dots(),
    });
    if edge.segments < 2 {
        return;
    }
    // One mark per mutation between the endpoints.
    let marks = (1..edge.segments)
        .map(|dot| start + (end - start) * (dot as f32 / edge.segments as f32))
        .collect_vec();
    if edge.style.has_bubbles() {
        if edge.hovered {
            for &center in &marks {
                out.push(Shape::Circle {
                    center,
                    radius: HIGHLIGHT_BUBBLE_RADIUS,
                    fill: edge.highlight_color,
                    stroke: None,
                });
            }
        }
        for &center in &marks {
            out.push(Shape::Circle {
                center,
                radius: BUBBLE_RADIUS,
                fill: Color32::BLACK,
                stroke: None,
            });
        }
    }
    if edge.style.has_bars() {
        let normal = (end - start).normalized().rot90();
        for &center in &marks {
            out.push(Shape::Line {
                start: center - normal * BAR_HALF_LENGTH,
                end: center + normal * BAR_HALF_LENGTH,
                stroke,
                dotted: false,
            });
        }
    }
}

fn vertex_shapes(vertex: &Vertex, nothing_grabbed: bool, out: &mut Vec<Shape>) {
    out.push(Shape::Circle {
        center: vertex.pos,
        radius: vertex.radius,
        fill: Color32::BLACK,
        stroke: Some(border_stroke(vertex, nothing_grabbed)),
    });
}

fn node_shapes(node: &Node, nothing_grabbed: bool, out: &mut Vec<Shape>) {
    let vertex = &node.vertex;
    let border = border_stroke(vertex, nothing_grabbed);
    if node.pies.is_empty() {
        out.push(Shape::Circle {
            center: vertex.pos,
            radius: vertex.radius,
            fill: node.fill,
            stroke: Some(border),
        });
        return;
    }
    out.push(Shape::Circle {
        center: vertex.pos,
        radius: vertex.radius,
        fill: node.fill,
        stroke: None,
    });
    let mut angle = PIE_START_ANGLE;
    for pie in &node.pies {
        let span = pie.fraction * TAU;
        out.push(Shape::Pie {
            center: vertex.pos,
            radius: vertex.radius,
            start_angle: angle,
            span,
            fill: pie.color,
        });
        angle += span;
    }
    // Border over the sectors.
    out.push(Shape::Circle {
        center: vertex.pos,
        radius: vertex.radius,
        fill: Color32::TRANSPARENT,
        stroke: Some(border),
    });
}

fn label_shapes(label: &Label, nothing_grabbed: bool, out: &mut Vec<Shape>) {
    if !label.visible {
        return;
    }
    let highlighted = label.pressed || (label.hovered && nothing_grabbed);
    let outline = if highlighted {
        Some(label.highlight_color)
    } else if label.white_outline {
        Some(Color32::WHITE)
    } else {
        None
    };
    out.push(Shape::Text {
        text: label.text.clone(),
        center: label.pos(),
        color: Color32::BLACK,
        outline,
    });
}

fn bezier_shapes(bezier: &BezierCurve, out: &mut Vec<Shape>) {
    out.push(Shape::CubicBezier {
        points: bezier.points(),
        stroke: Stroke::new(STROKE_WIDTH, Color32::RED),
    });
    if !bezier.show_handles {
        return;
    }
    let gray = Stroke::new(BORDER_WIDTH, Color32::GRAY);
    out.push(Shape::Line {
        start: bezier.p1,
        end: bezier.c1,
        stroke: gray,
        dotted: false,
    });
    out.push(Shape::Line {
        start: bezier.p2,
        end: bezier.c2,
        stroke: gray,
        dotted: false,
    });
    for handle in [bezier.c1, bezier.c2] {
        out.push(Shape::Circle {
            center: handle,
            radius: BEZIER_HANDLE_RADIUS,
            fill: Color32::RED,
            stroke: Some(gray),
        });
    }
}

#[cfg(test)]
mod tests {
    use egui::pos2;
    use hapnet_core::{items::EdgeStyle, scene::GraphicsScene, settings::Settings};
    use indexmap::IndexMap;

    use super::*;

    fn node(scene: &mut GraphicsScene, pos: egui::Pos2, radius: f32, name: &str) -> hapnet_core::items::ItemId {
        let mut weights = IndexMap::new();
        weights.insert("X".to_owned(), 1);
        scene.create_node(pos, radius, name, weights)
    }

    #[test]
    fn bubble_edges_emit_one_dot_per_inner_segment() {
        let mut scene = GraphicsScene::new(Settings::new());
        let a = node(&mut scene, pos2(0.0, 0.0), 5.0, "a");
        let b = node(&mut scene, pos2(100.0, 0.0), 5.0, "b");
        scene.add_child(a, b, 3).unwrap();

        let shapes = generate_shapes(&scene.read());
        let dots = shapes
            .shapes
            .iter()
            .filter(|shape| {
                matches!(shape, Shape::Circle { radius, .. } if *radius == BUBBLE_RADIUS)
            })
            .count();
        assert_eq!(dots, 2);
    }

    #[test]
    fn hovered_edges_gain_a_highlight_line() {
        let mut scene = GraphicsScene::new(Settings::new());
        let a = node(&mut scene, pos2(0.0, 0.0), 5.0, "a");
        let b = node(&mut scene, pos2(100.0, 0.0), 5.0, "b");
        scene.add_child(a, b, 1).unwrap();

        let before = generate_shapes(&scene.read());
        assert!(!before.shapes.iter().any(|shape| {
            matches!(shape, Shape::Line { stroke, .. } if stroke.width == HIGHLIGHT_LINE_WIDTH)
        }));

        scene.pointer_move(pos2(50.0, 0.0));
        let after = generate_shapes(&scene.read());
        assert!(after.shapes.iter().any(|shape| {
            matches!(shape, Shape::Line { stroke, .. } if stroke.width == HIGHLIGHT_LINE_WIDTH)
        }));
    }

    #[test]
    fn divided_nodes_emit_pie_sectors_under_a_border() {
        let settings = Settings::new();
        settings.divisions.borrow_mut().set_keys(["X", "Y", "Z"]);
        let mut scene = GraphicsScene::new(settings);
        let mut weights = IndexMap::new();
        weights.insert("X".to_owned(), 2);
        weights.insert("Y".to_owned(), 1);
        weights.insert("Z".to_owned(), 1);
        scene.create_node(pos2(0.0, 0.0), 20.0, "n", weights);

        let shapes = generate_shapes(&scene.read());
        let pies = shapes
            .shapes
            .iter()
            .filter(|shape| matches!(shape, Shape::Pie { .. }))
            .count();
        assert_eq!(pies, 2);
    }

    #[test]
    fn hidden_labels_are_not_drawn() {
        let mut scene = GraphicsScene::new(Settings::new());
        let a = node(&mut scene, pos2(0.0, 0.0), 5.0, "a");
        let b = node(&mut scene, pos2(100.0, 0.0), 5.0, "b");
        scene.add_child(a, b, 2).unwrap();

        // Bubbles style hides the edge label; the two node labels stay.
        let shapes = generate_shapes(&scene.read());
        let texts = shapes
            .shapes
            .iter()
            .filter(|shape| matches!(shape, Shape::Text { .. }))
            .count();
        assert_eq!(texts, 2);

        scene.style_edges(EdgeStyle::PlainWithText, 0);
        let shapes = generate_shapes(&scene.read());
        let texts = shapes
            .shapes
            .iter()
            .filter(|shape| matches!(shape, Shape::Text { .. }))
            .count();
        assert_eq!(texts, 3);
    }
}
