//! Scene items: vertices, pie-chart nodes, edges, labels and bezier
//! decorations, stored arena-style and addressed by [`ItemId`].

use egui::{Color32, Pos2, Rect, Vec2, pos2, vec2};
use indexmap::IndexMap;

use crate::divisions::ColorMap;

pub const DEFAULT_VERTEX_RADIUS: f32 = 2.5;
pub const LABEL_FONT_SIZE: f32 = 16.0;
pub const BEZIER_HANDLE_RADIUS: f32 = 4.0;

/// Hit-test slop around a vertex disc.
pub(crate) const VERTEX_HIT_PADDING: f32 = 3.0;
/// Average glyph width as a fraction of the font size, for the
/// approximate label metrics (no font engine in the core).
const GLYPH_ASPECT: f32 = 0.6;
const LABEL_PADDING: f32 = 3.0;

/// Index of an item in the scene arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Vertex,
    Node,
    Edge,
    Label,
    Bezier,
}

impl ItemKind {
    #[must_use]
    pub const fn has_label(self) -> bool {
        matches!(self, ItemKind::Node | ItemKind::Edge)
    }

    #[must_use]
    pub const fn has_children(self) -> bool {
        matches!(self, ItemKind::Vertex | ItemKind::Node)
    }

    #[must_use]
    pub const fn is_edge_endpoint(self) -> bool {
        matches!(self, ItemKind::Vertex | ItemKind::Node)
    }

    #[must_use]
    pub const fn is_edge(self) -> bool {
        matches!(self, ItemKind::Edge)
    }
}

#[derive(Clone, Debug)]
pub enum Item {
    Vertex(Vertex),
    Node(Node),
    Edge(Edge),
    Label(Label),
    Bezier(BezierCurve),
}

impl Item {
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Vertex(_) => ItemKind::Vertex,
            Item::Node(_) => ItemKind::Node,
            Item::Edge(_) => ItemKind::Edge,
            Item::Label(_) => ItemKind::Label,
            Item::Bezier(_) => ItemKind::Bezier,
        }
    }

    #[must_use]
    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            Item::Vertex(vertex) => Some(vertex),
            Item::Node(node) => Some(&node.vertex),
            _ => None,
        }
    }

    pub fn as_vertex_mut(&mut self) -> Option<&mut Vertex> {
        match self {
            Item::Vertex(vertex) => Some(vertex),
            Item::Node(node) => Some(&mut node.vertex),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Item::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match self {
            Item::Node(node) => Some(node),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Item::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    pub fn as_edge_mut(&mut self) -> Option<&mut Edge> {
        match self {
            Item::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_label(&self) -> Option<&Label> {
        match self {
            Item::Label(label) => Some(label),
            _ => None,
        }
    }

    pub fn as_label_mut(&mut self) -> Option<&mut Label> {
        match self {
            Item::Label(label) => Some(label),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bezier(&self) -> Option<&BezierCurve> {
        match self {
            Item::Bezier(bezier) => Some(bezier),
            _ => None,
        }
    }

    pub fn as_bezier_mut(&mut self) -> Option<&mut BezierCurve> {
        match self {
            Item::Bezier(bezier) => Some(bezier),
            _ => None,
        }
    }

    /// The owned label of a node or edge, if any.
    #[must_use]
    pub fn label_id(&self) -> Option<ItemId> {
        match self {
            Item::Node(node) => node.label,
            Item::Edge(edge) => edge.label,
            _ => None,
        }
    }
}

/// Anchor entity: a position, a mark, and the dual adjacency. Child
/// links follow tree discipline, sibling links form an arbitrary
/// undirected graph on top.
#[derive(Clone, Debug)]
pub struct Vertex {
    pub pos: Pos2,
    pub radius: f32,
    pub parent: Option<ItemId>,
    pub children: Vec<ItemId>,
    pub siblings: Vec<ItemId>,
    /// Peer vertex id to the edge connecting it.
    pub edges: IndexMap<ItemId, ItemId>,
    pub rotational: bool,
    pub recursive: bool,
    pub highlight_color: Color32,
    pub hovered: bool,
    pub pressed: bool,
}

impl Vertex {
    #[must_use]
    pub fn new(pos: Pos2, radius: f32) -> Self {
        Self {
            pos,
            radius,
            parent: None,
            children: Vec::new(),
            siblings: Vec::new(),
            edges: IndexMap::new(),
            rotational: false,
            recursive: false,
            highlight_color: Color32::from_rgb(0xff, 0x00, 0xff),
            hovered: false,
            pressed: false,
        }
    }

    #[must_use]
    pub fn contains(&self, point: Pos2) -> bool {
        self.pos.distance(point) <= self.radius + VERTEX_HIT_PADDING
    }

    /// The edge linking this vertex to its parent, if parented.
    #[must_use]
    pub fn parent_edge(&self) -> Option<ItemId> {
        self.parent.and_then(|parent| self.edges.get(&parent).copied())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PieSlice {
    pub color: Color32,
    /// Fraction of the full disc, in `0..=1`.
    pub fraction: f32,
}

/// A vertex with a name and a weighted category breakdown rendered as
/// pie slices. The first category colours the base disc; the remaining
/// categories become sectors starting at twelve o'clock.
#[derive(Clone, Debug)]
pub struct Node {
    pub vertex: Vertex,
    pub name: String,
    pub weights: IndexMap<String, u64>,
    pub fill: Color32,
    pub pies: Vec<PieSlice>,
    pub label: Option<ItemId>,
}

impl Node {
    #[must_use]
    pub fn new(pos: Pos2, radius: f32, name: &str, weights: IndexMap<String, u64>) -> Self {
        Self {
            vertex: Vertex::new(pos, radius),
            name: name.to_owned(),
            weights,
            fill: Color32::BLACK,
            pies: Vec::new(),
            label: None,
        }
    }

    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.weights.values().sum()
    }

    /// Re-derives the base fill and pie sectors from a colour map.
    pub fn update_colors(&mut self, map: &ColorMap) {
        let total = self.total_weight();
        let mut weights = self.weights.iter();
        let Some((first_key, _)) = weights.next() else {
            self.fill = map.default_color();
            self.pies.clear();
            return;
        };
        self.fill = map.get(first_key);
        self.pies = weights
            .map(|(key, weight)| PieSlice {
                color: map.get(key),
                fraction: if total == 0 {
                    0.0
                } else {
                    *weight as f32 / total as f32
                },
            })
            .collect();
    }
}

/// Discrete edge rendering styles with their capability flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeStyle {
    Bubbles,
    Bars,
    Plain,
    DotsWithText,
    Collapsed,
    PlainWithText,
}

impl EdgeStyle {
    pub const ALL: [EdgeStyle; 6] = [
        EdgeStyle::Bubbles,
        EdgeStyle::Bars,
        EdgeStyle::Plain,
        EdgeStyle::DotsWithText,
        EdgeStyle::Collapsed,
        EdgeStyle::PlainWithText,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            EdgeStyle::Bubbles => "Bubbles",
            EdgeStyle::Bars => "Bars",
            EdgeStyle::Plain => "Plain",
            EdgeStyle::DotsWithText => "Dots with text",
            EdgeStyle::Collapsed => "Collapsed",
            EdgeStyle::PlainWithText => "Plain with text",
        }
    }

    #[must_use]
    pub const fn has_bubbles(self) -> bool {
        matches!(self, EdgeStyle::Bubbles)
    }

    #[must_use]
    pub const fn has_bars(self) -> bool {
        matches!(self, EdgeStyle::Bars)
    }

    #[must_use]
    pub const fn has_dots(self) -> bool {
        matches!(self, EdgeStyle::DotsWithText | EdgeStyle::Collapsed)
    }

    #[must_use]
    pub const fn has_text(self) -> bool {
        matches!(
            self,
            EdgeStyle::DotsWithText | EdgeStyle::PlainWithText
        )
    }

    /// The next style in the double-click cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            EdgeStyle::Bubbles => EdgeStyle::Bars,
            EdgeStyle::Bars => EdgeStyle::Plain,
            EdgeStyle::Plain => EdgeStyle::DotsWithText,
            EdgeStyle::DotsWithText => EdgeStyle::Collapsed,
            EdgeStyle::Collapsed => EdgeStyle::PlainWithText,
            EdgeStyle::PlainWithText => EdgeStyle::Bubbles,
        }
    }

    /// Counterpart used for edges past the segment-count cutoff.
    #[must_use]
    pub const fn collapsed_counterpart(self) -> Self {
        match self {
            EdgeStyle::Bubbles => EdgeStyle::DotsWithText,
            EdgeStyle::Bars => EdgeStyle::Collapsed,
            EdgeStyle::Plain => EdgeStyle::PlainWithText,
            other => other,
        }
    }
}

/// Connector between two vertices. The drawn line is trimmed by the
/// endpoint radii and hidden entirely when the discs overlap.
#[derive(Clone, Debug)]
pub struct Edge {
    pub node1: ItemId,
    pub node2: ItemId,
    pub segments: u32,
    pub style: EdgeStyle,
    pub label: Option<ItemId>,
    pub line: Option<(Pos2, Pos2)>,
    pub hovered: bool,
    pub highlight_color: Color32,
}

impl Edge {
    #[must_use]
    pub fn new(node1: ItemId, node2: ItemId, segments: u32) -> Self {
        Self {
            node1,
            node2,
            segments,
            style: EdgeStyle::Bubbles,
            label: None,
            line: None,
            hovered: false,
            highlight_color: Color32::from_rgb(0xff, 0x00, 0xff),
        }
    }

    /// Recomputes the trimmed line from the endpoint discs. Returns the
    /// midpoint for anchoring the edge label, or `None` when hidden.
    pub fn adjust(&mut self, pos1: Pos2, radius1: f32, pos2: Pos2, radius2: f32) -> Option<Pos2> {
        let delta = pos2 - pos1;
        let length = delta.length();
        if length < radius1 + radius2 {
            self.line = None;
            return None;
        }
        let direction = delta / length;
        let start = pos1 + direction * radius1;
        let end = pos2 - direction * radius2;
        self.line = Some((start, end));
        Some(start + (end - start) * 0.5)
    }
}

/// Draggable text bound to exactly one owning item. The position is an
/// offset from the owner's anchor; locked labels ignore drags.
#[derive(Clone, Debug)]
pub struct Label {
    pub owner: ItemId,
    pub text: String,
    pub anchor: Pos2,
    pub offset: Vec2,
    pub visible: bool,
    pub locked: bool,
    pub white_outline: bool,
    pub highlight_color: Color32,
    pub hovered: bool,
    pub pressed: bool,
    rect: Rect,
}

impl Label {
    #[must_use]
    pub fn new(owner: ItemId, text: &str, anchor: Pos2) -> Self {
        Self {
            owner,
            text: text.to_owned(),
            anchor,
            offset: Vec2::ZERO,
            visible: true,
            locked: true,
            white_outline: false,
            highlight_color: Color32::from_rgb(0xff, 0x00, 0xff),
            hovered: false,
            pressed: false,
            rect: Self::text_rect(text),
        }
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_owned();
        self.rect = Self::text_rect(text);
    }

    /// Snaps the label back onto its anchor.
    pub fn recenter(&mut self) {
        self.offset = Vec2::ZERO;
    }

    #[must_use]
    pub fn pos(&self) -> Pos2 {
        self.anchor + self.offset
    }

    /// Bounding rectangle in scene coordinates.
    #[must_use]
    pub fn scene_rect(&self) -> Rect {
        self.rect.translate(self.pos().to_vec2())
    }

    #[must_use]
    pub fn contains(&self, point: Pos2) -> bool {
        self.visible && self.scene_rect().contains(point)
    }

    // Approximate centred text metrics; the core carries no font
    // engine, so glyphs are measured by aspect ratio.
    fn text_rect(text: &str) -> Rect {
        let width = text.chars().count() as f32 * LABEL_FONT_SIZE * GLYPH_ASPECT;
        Rect::from_center_size(pos2(0.0, 0.0), vec2(width, LABEL_FONT_SIZE))
            .expand(LABEL_PADDING)
    }
}

/// Freestanding cubic bezier decoration with draggable control handles.
#[derive(Clone, Debug)]
pub struct BezierCurve {
    pub p1: Pos2,
    pub p2: Pos2,
    pub c1: Pos2,
    pub c2: Pos2,
    pub show_handles: bool,
}

const BEZIER_SAMPLES: u32 = 100;

impl BezierCurve {
    #[must_use]
    pub fn new(p1: Pos2, p2: Pos2) -> Self {
        Self {
            p1,
            p2,
            c1: p1,
            c2: p2,
            show_handles: false,
        }
    }

    #[must_use]
    pub fn points(&self) -> [Pos2; 4] {
        [self.p1, self.c1, self.c2, self.p2]
    }

    #[must_use]
    pub fn sample(&self, t: f32) -> Pos2 {
        let u = 1.0 - t;
        let [p1, c1, c2, p2] = self.points();
        pos2(
            u * u * u * p1.x + 3.0 * u * u * t * c1.x + 3.0 * u * t * t * c2.x + t * t * t * p2.x,
            u * u * u * p1.y + 3.0 * u * u * t * c1.y + 3.0 * u * t * t * c2.y + t * t * t * p2.y,
        )
    }

    /// Whether `point` lies on the curve within `tolerance`, by
    /// sampling.
    #[must_use]
    pub fn contains(&self, point: Pos2, tolerance: f32) -> bool {
        (0..=BEZIER_SAMPLES).any(|step| {
            let t = step as f32 / BEZIER_SAMPLES as f32;
            self.sample(t).distance(point) < tolerance
        })
    }

    /// Which control handle sits under `point`, when handles are shown.
    #[must_use]
    pub fn handle_at(&self, point: Pos2) -> Option<BezierHandle> {
        if !self.show_handles {
            return None;
        }
        let tolerance = BEZIER_HANDLE_RADIUS + VERTEX_HIT_PADDING;
        if self.c1.distance(point) <= tolerance {
            Some(BezierHandle::First)
        } else if self.c2.distance(point) <= tolerance {
            Some(BezierHandle::Second)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BezierHandle {
    First,
    Second,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(EdgeStyle::Bubbles, EdgeStyle::DotsWithText)]
    #[case(EdgeStyle::Bars, EdgeStyle::Collapsed)]
    #[case(EdgeStyle::Plain, EdgeStyle::PlainWithText)]
    #[case(EdgeStyle::Collapsed, EdgeStyle::Collapsed)]
    fn collapsed_counterparts(#[case] style: EdgeStyle, #[case] expected: EdgeStyle) {
        assert_eq!(style.collapsed_counterpart(), expected);
    }

    #[test]
    fn style_cycle_covers_every_style() {
        let mut style = EdgeStyle::Bubbles;
        let mut seen = Vec::new();
        for _ in 0..EdgeStyle::ALL.len() {
            seen.push(style);
            style = style.next();
        }
        assert_eq!(style, EdgeStyle::Bubbles);
        for expected in EdgeStyle::ALL {
            assert!(seen.contains(&expected));
        }
    }

    #[test]
    fn edge_adjust_trims_by_radii() {
        let mut edge = Edge::new(ItemId(0), ItemId(1), 1);
        let mid = edge.adjust(pos2(0.0, 0.0), 10.0, pos2(100.0, 0.0), 20.0);
        assert_eq!(edge.line, Some((pos2(10.0, 0.0), pos2(80.0, 0.0))));
        assert_eq!(mid, Some(pos2(45.0, 0.0)));
    }

    #[test]
    fn edge_adjust_hides_overlapping_discs() {
        let mut edge = Edge::new(ItemId(0), ItemId(1), 1);
        edge.adjust(pos2(0.0, 0.0), 10.0, pos2(100.0, 0.0), 20.0);
        assert!(edge.line.is_some());
        assert_eq!(edge.adjust(pos2(0.0, 0.0), 10.0, pos2(15.0, 0.0), 20.0), None);
        assert_eq!(edge.line, None);
    }

    #[test]
    fn node_colors_follow_insertion_order() {
        let mut weights = IndexMap::new();
        weights.insert("X".to_owned(), 4);
        weights.insert("Y".to_owned(), 3);
        weights.insert("Z".to_owned(), 1);
        let mut node = Node::new(pos2(0.0, 0.0), 10.0, "n", weights);

        let mut divisions =
            crate::divisions::DivisionList::new(crate::palette::Palette::spring());
        divisions.set_keys(["X", "Y", "Z"]);
        let map = divisions.get_color_map();

        node.update_colors(&map);
        assert_eq!(node.fill, map.get("X"));
        assert_eq!(node.pies.len(), 2);
        assert_eq!(node.pies[0].color, map.get("Y"));
        assert!((node.pies[0].fraction - 3.0 / 8.0).abs() < 1e-6);
        assert_eq!(node.pies[1].color, map.get("Z"));
        assert!((node.pies[1].fraction - 1.0 / 8.0).abs() < 1e-6);
    }

    #[test]
    fn label_drag_offset_moves_scene_rect() {
        let mut label = Label::new(ItemId(0), "abc", pos2(50.0, 50.0));
        let centred = label.scene_rect();
        assert_eq!(centred.center(), pos2(50.0, 50.0));
        label.offset = vec2(10.0, -5.0);
        assert_eq!(label.scene_rect().center(), pos2(60.0, 45.0));
        label.recenter();
        assert_eq!(label.scene_rect(), centred);
    }

    #[test]
    fn bezier_contains_its_endpoints_and_midpoint() {
        let bezier = BezierCurve::new(pos2(0.0, 0.0), pos2(200.0, 0.0));
        assert!(bezier.contains(pos2(0.0, 0.0), 1.0));
        assert!(bezier.contains(pos2(100.0, 0.0), 2.0));
        assert!(!bezier.contains(pos2(100.0, 50.0), 5.0));
    }
}
