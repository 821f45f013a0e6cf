//! The interaction core.
//!
//! [`GraphicsScene`] owns the full set of live items, mediates pointer
//! input (hover, grab, drag, double-click), and is the sole mutator of
//! the topology. Item storage is a flat arena indexed by [`ItemId`];
//! adjacency is kept as index lists on each vertex, with child links
//! forming a tree and sibling links an arbitrary peer graph on top.
//!
//! Every newly created item is wired to the relevant [`Settings`]
//! properties through a [`Binder`], so a global settings write reaches
//! all live items without the caller enumerating them. The bindings of
//! an item are released when it is removed.

use std::{
    cell::{Ref, RefCell},
    collections::{HashMap, HashSet},
    rc::{Rc, Weak},
};

use egui::{Color32, Pos2, emath::Rot2};
use indexmap::IndexMap;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use slab::Slab;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    bindings::{Binder, BindingId, Property},
    items::{
        BezierCurve, BezierHandle, DEFAULT_VERTEX_RADIUS, Edge, EdgeStyle, Item, ItemId, ItemKind,
        Label, Node, Vertex,
    },
    settings::Settings,
};

/// Maximum distance from an edge segment at which the edge is still a
/// hit-test candidate.
pub const EDGE_HIT_TOLERANCE: f32 = 7.0;
const BEZIER_HIT_TOLERANCE: f32 = 6.0;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("an edge cannot connect a vertex to itself")]
    SelfLoop,
    #[error("vertex already has a parent")]
    AlreadyParented,
    #[error("the vertices are already connected")]
    AlreadyConnected,
    #[error("item is not a vertex")]
    NotAVertex,
}

#[derive(Clone, Debug)]
struct DragState {
    item: ItemId,
    /// Pointer position at grab time.
    origin: Pos2,
    mode: DragMode,
}

#[derive(Clone, Debug)]
enum DragMode {
    /// Rigid translation of the locked items from their grab-time
    /// positions.
    Translate { locked: Vec<(ItemId, Pos2)> },
    /// Orbit of the locked items about the parent anchor, by the angle
    /// subtended between the grab vector and the current vector.
    Rotate { center: Pos2, locked: Vec<(ItemId, Pos2)> },
    Label { start: egui::Vec2 },
    Curve { start: [Pos2; 4] },
    Handle(BezierHandle),
}

/// Item arena plus the transient interaction state.
///
/// Mutation goes through [`GraphicsScene`]; readers obtain a shared
/// borrow via [`GraphicsScene::read`].
#[derive(Default)]
pub struct SceneState {
    items: Slab<Item>,
    /// Draw order, bottom first. Edges sit at the front so vertices
    /// and labels paint over them.
    order: Vec<ItemId>,
    hovered: Option<ItemId>,
    grabbed: Option<ItemId>,
    highlighted_edge: Option<ItemId>,
    drag: Option<DragState>,
}

impl SceneState {
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.0)
    }

    /// Items in draw order, bottom-most first.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &Item)> {
        self.order.iter().map(|id| (*id, &self.items[id.0]))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn hovered(&self) -> Option<ItemId> {
        self.hovered
    }

    #[must_use]
    pub fn grabbed(&self) -> Option<ItemId> {
        self.grabbed
    }

    #[must_use]
    pub fn highlighted_edge(&self) -> Option<ItemId> {
        self.highlighted_edge
    }

    #[must_use]
    pub fn vertex(&self, id: ItemId) -> Option<&Vertex> {
        self.items.get(id.0).and_then(Item::as_vertex)
    }

    #[must_use]
    pub fn node(&self, id: ItemId) -> Option<&Node> {
        self.items.get(id.0).and_then(Item::as_node)
    }

    #[must_use]
    pub fn edge(&self, id: ItemId) -> Option<&Edge> {
        self.items.get(id.0).and_then(Item::as_edge)
    }

    #[must_use]
    pub fn label(&self, id: ItemId) -> Option<&Label> {
        self.items.get(id.0).and_then(Item::as_label)
    }

    #[must_use]
    pub fn bezier(&self, id: ItemId) -> Option<&BezierCurve> {
        self.items.get(id.0).and_then(Item::as_bezier)
    }

    fn vertex_mut(&mut self, id: ItemId) -> Option<&mut Vertex> {
        self.items.get_mut(id.0).and_then(Item::as_vertex_mut)
    }

    fn node_mut(&mut self, id: ItemId) -> Option<&mut Node> {
        self.items.get_mut(id.0).and_then(Item::as_node_mut)
    }

    fn edge_mut(&mut self, id: ItemId) -> Option<&mut Edge> {
        self.items.get_mut(id.0).and_then(Item::as_edge_mut)
    }

    fn label_mut(&mut self, id: ItemId) -> Option<&mut Label> {
        self.items.get_mut(id.0).and_then(Item::as_label_mut)
    }

    fn bezier_mut(&mut self, id: ItemId) -> Option<&mut BezierCurve> {
        self.items.get_mut(id.0).and_then(Item::as_bezier_mut)
    }

    /// The item under `point`, top-most first, with the tie-break order
    /// vertex > label > bezier > nearest edge. Edges qualify within
    /// [`EDGE_HIT_TOLERANCE`] of their segment and are ranked by
    /// perpendicular distance to their infinite line.
    #[must_use]
    pub fn item_at_pos(
        &self,
        point: Pos2,
        ignore_edges: bool,
        ignore_labels: bool,
    ) -> Option<ItemId> {
        let mut label_hit = None;
        let mut bezier_hit = None;
        let mut closest_edge: Option<(ItemId, OrderedFloat<f32>)> = None;

        for &id in self.order.iter().rev() {
            match &self.items[id.0] {
                Item::Vertex(vertex) => {
                    if vertex.contains(point) {
                        return Some(id);
                    }
                }
                Item::Node(node) => {
                    if node.vertex.contains(point) {
                        return Some(id);
                    }
                }
                Item::Label(label) => {
                    if !ignore_labels && label_hit.is_none() && label.contains(point) {
                        label_hit = Some(id);
                    }
                }
                Item::Bezier(bezier) => {
                    if bezier_hit.is_none()
                        && (bezier.handle_at(point).is_some()
                            || bezier.contains(point, BEZIER_HIT_TOLERANCE))
                    {
                        bezier_hit = Some(id);
                    }
                }
                Item::Edge(edge) => {
                    if ignore_edges {
                        continue;
                    }
                    let Some((p1, p2)) = edge.line else { continue };
                    if distance_to_segment(point, p1, p2) > EDGE_HIT_TOLERANCE {
                        continue;
                    }
                    let distance = OrderedFloat(distance_to_line(point, p1, p2));
                    if closest_edge.is_none_or(|(_, best)| distance < best) {
                        closest_edge = Some((id, distance));
                    }
                }
            }
        }

        label_hit
            .or(bezier_hit)
            .or(closest_edge.map(|(id, _)| id))
    }

    fn insert(&mut self, item: Item) -> ItemId {
        let is_edge = item.kind().is_edge();
        let id = ItemId(self.items.insert(item));
        if is_edge {
            self.order.insert(0, id);
        } else {
            self.order.push(id);
        }
        id
    }

    fn check_link(&self, first: ItemId, second: ItemId) -> Result<(), SceneError> {
        if first == second {
            return Err(SceneError::SelfLoop);
        }
        let vertex = self.vertex(first).ok_or(SceneError::NotAVertex)?;
        self.vertex(second).ok_or(SceneError::NotAVertex)?;
        if vertex.edges.contains_key(&second) {
            return Err(SceneError::AlreadyConnected);
        }
        Ok(())
    }

    fn insert_edge_label(&mut self, edge_id: ItemId, segments: u32) -> ItemId {
        let style = self
            .edge(edge_id)
            .map_or(EdgeStyle::Bubbles, |edge| edge.style);
        let mut label = Label::new(edge_id, &segments.to_string(), Pos2::ZERO);
        label.white_outline = true;
        label.visible = style.has_text();
        let label_id = self.insert(Item::Label(label));
        if let Some(edge) = self.edge_mut(edge_id) {
            edge.label = Some(label_id);
        }
        label_id
    }

    /// Recomputes an edge's trimmed line from its endpoint discs and
    /// re-anchors its label at the midpoint. A hidden edge hides its
    /// label with it.
    fn adjust_edge(&mut self, id: ItemId) {
        let Some((node1, node2, label, has_text)) = self
            .edge(id)
            .map(|edge| (edge.node1, edge.node2, edge.label, edge.style.has_text()))
        else {
            return;
        };
        let Some((p1, r1)) = self.vertex(node1).map(|v| (v.pos, v.radius)) else {
            return;
        };
        let Some((p2, r2)) = self.vertex(node2).map(|v| (v.pos, v.radius)) else {
            return;
        };
        let midpoint = self
            .edge_mut(id)
            .and_then(|edge| edge.adjust(p1, r1, p2, r2));
        if let Some(label) = label.and_then(|label| self.label_mut(label)) {
            label.visible = has_text && midpoint.is_some();
            if let Some(midpoint) = midpoint {
                label.anchor = midpoint;
            }
        }
    }

    /// Moves a vertex and synchronously re-routes its incident edges
    /// and re-anchors its label.
    fn set_vertex_pos(&mut self, id: ItemId, pos: Pos2) {
        let Some(vertex) = self.vertex_mut(id) else { return };
        vertex.pos = pos;
        let incident = vertex.edges.values().copied().collect_vec();
        let label = self.items.get(id.0).and_then(|item| item.label_id());
        if let Some(label) = label.and_then(|label| self.label_mut(label)) {
            label.anchor = pos;
        }
        for edge in incident {
            self.adjust_edge(edge);
        }
    }

    /// The vertex and all its child-subtree descendants, with their
    /// current positions. Siblings are not part of the subtree.
    fn subtree_positions(&self, root: ItemId) -> Vec<(ItemId, Pos2)> {
        let mut locked = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some(vertex) = self.vertex(id) {
                locked.push((id, vertex.pos));
                stack.extend(vertex.children.iter().copied());
            }
        }
        locked
    }

    fn begin_drag(&self, id: ItemId, pos: Pos2) -> Option<DragState> {
        let mode = match &self.items[id.0] {
            Item::Vertex(_) | Item::Node(_) => {
                let vertex = self.vertex(id)?;
                let locked = if vertex.recursive {
                    self.subtree_positions(id)
                } else {
                    vec![(id, vertex.pos)]
                };
                let center = vertex
                    .parent
                    .filter(|_| vertex.rotational)
                    .and_then(|parent| self.vertex(parent))
                    .map(|parent| parent.pos);
                match center {
                    Some(center) => DragMode::Rotate { center, locked },
                    // Roots always translate.
                    None => DragMode::Translate { locked },
                }
            }
            Item::Label(label) => {
                if label.locked {
                    return None;
                }
                DragMode::Label { start: label.offset }
            }
            Item::Bezier(bezier) => match bezier.handle_at(pos) {
                Some(handle) => DragMode::Handle(handle),
                None => DragMode::Curve {
                    start: bezier.points(),
                },
            },
            Item::Edge(_) => return None,
        };
        Some(DragState {
            item: id,
            origin: pos,
            mode,
        })
    }

    fn drag_to(&mut self, pos: Pos2) {
        let Some(drag) = self.drag.clone() else { return };
        match drag.mode {
            DragMode::Translate { locked } => {
                let delta = pos - drag.origin;
                for (id, start) in locked {
                    self.set_vertex_pos(id, start + delta);
                }
            }
            DragMode::Rotate { center, locked } => {
                if pos == center {
                    return;
                }
                let rotation =
                    Rot2::from_angle((pos - center).angle() - (drag.origin - center).angle());
                for (id, start) in locked {
                    self.set_vertex_pos(id, center + rotation * (start - center));
                }
            }
            DragMode::Label { start } => {
                if let Some(label) = self.label_mut(drag.item) {
                    label.offset = start + (pos - drag.origin);
                }
            }
            DragMode::Curve { start } => {
                let delta = pos - drag.origin;
                if let Some(bezier) = self.bezier_mut(drag.item) {
                    let [p1, c1, c2, p2] = start;
                    bezier.p1 = p1 + delta;
                    bezier.c1 = c1 + delta;
                    bezier.c2 = c2 + delta;
                    bezier.p2 = p2 + delta;
                }
            }
            DragMode::Handle(handle) => {
                if let Some(bezier) = self.bezier_mut(drag.item) {
                    match handle {
                        BezierHandle::First => bezier.c1 = pos,
                        BezierHandle::Second => bezier.c2 = pos,
                    }
                }
            }
        }
    }

    fn set_item_hovered(&mut self, id: ItemId, value: bool) {
        let Some(item) = self.items.get_mut(id.0) else { return };
        let label = match item {
            Item::Vertex(vertex) => {
                vertex.hovered = value;
                None
            }
            Item::Node(node) => {
                node.vertex.hovered = value;
                node.label
            }
            Item::Edge(edge) => {
                edge.hovered = value;
                edge.label
            }
            Item::Label(label) => {
                label.hovered = value;
                None
            }
            Item::Bezier(_) => None,
        };
        if let Some(label) = label.and_then(|label| self.label_mut(label)) {
            label.hovered = value;
        }
    }

    fn set_item_pressed(&mut self, id: ItemId, value: bool) {
        match self.items.get_mut(id.0) {
            Some(Item::Vertex(vertex)) => vertex.pressed = value,
            Some(Item::Node(node)) => node.vertex.pressed = value,
            Some(Item::Label(label)) => label.pressed = value,
            _ => {}
        }
    }

    fn set_hovered(&mut self, hit: Option<ItemId>) {
        if self.hovered == hit {
            return;
        }
        if let Some(old) = self.hovered.take() {
            self.set_item_hovered(old, false);
        }
        self.hovered = hit;
        if let Some(new) = hit {
            self.set_item_hovered(new, true);
        }
    }

    /// Derives the highlighted edge from the pressed-else-hovered item:
    /// when that item is a child vertex, its parent edge lights up.
    fn update_highlighted_edge(&mut self) {
        let source = self.grabbed.or(self.hovered);
        let edge = source
            .and_then(|id| self.items.get(id.0))
            .and_then(Item::as_vertex)
            .and_then(Vertex::parent_edge);
        if self.highlighted_edge == edge {
            return;
        }
        if let Some(old) = self.highlighted_edge.take() {
            if self.hovered != Some(old) {
                self.set_item_hovered(old, false);
            }
        }
        self.highlighted_edge = edge;
        if let Some(new) = edge {
            self.set_item_hovered(new, true);
        }
    }

    fn set_edge_style(&mut self, id: ItemId, style: EdgeStyle) {
        let Some(edge) = self.edge_mut(id) else { return };
        edge.style = style;
        let label = edge.label;
        let line_shown = edge.line.is_some();
        if let Some(label) = label.and_then(|label| self.label_mut(label)) {
            label.visible = style.has_text() && line_shown;
            label.recenter();
        }
    }

    /// Drops all hover, press and drag state, so exported output never
    /// shows interaction artifacts.
    pub(crate) fn clear_transient(&mut self) {
        self.hovered = None;
        self.grabbed = None;
        self.highlighted_edge = None;
        self.drag = None;
        for (_, item) in self.items.iter_mut() {
            match item {
                Item::Vertex(vertex) => {
                    vertex.hovered = false;
                    vertex.pressed = false;
                }
                Item::Node(node) => {
                    node.vertex.hovered = false;
                    node.vertex.pressed = false;
                }
                Item::Edge(edge) => edge.hovered = false,
                Item::Label(label) => {
                    label.hovered = false;
                    label.pressed = false;
                }
                Item::Bezier(_) => {}
            }
        }
    }

    fn ids_of(&self, kind: ItemKind) -> Vec<ItemId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.items[id.0].kind() == kind)
            .collect_vec()
    }

    fn delete(&mut self, id: ItemId, removed: &mut Vec<ItemId>) {
        if self.items.try_remove(id.0).is_none() {
            return;
        }
        self.order.retain(|other| *other != id);
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        if self.grabbed == Some(id) {
            self.grabbed = None;
        }
        if self.highlighted_edge == Some(id) {
            self.highlighted_edge = None;
        }
        if self.drag.as_ref().is_some_and(|drag| drag.item == id) {
            self.drag = None;
        }
        removed.push(id);
    }

    /// Detaches an edge from both endpoints, severing the parent or
    /// sibling relation it carried, and deletes it with its label.
    fn remove_edge(&mut self, id: ItemId, removed: &mut Vec<ItemId>) {
        let Some((node1, node2, label)) = self
            .edge(id)
            .map(|edge| (edge.node1, edge.node2, edge.label))
        else {
            return;
        };
        for (this, peer) in [(node1, node2), (node2, node1)] {
            if let Some(vertex) = self.vertex_mut(this) {
                vertex.edges.shift_remove(&peer);
                vertex.siblings.retain(|sibling| *sibling != peer);
                vertex.children.retain(|child| *child != peer);
                if vertex.parent == Some(peer) {
                    vertex.parent = None;
                }
            }
        }
        if let Some(label) = label {
            self.delete(label, removed);
        }
        self.delete(id, removed);
    }

    /// Removes an item, cascading to incident edges and owned labels.
    /// Children of a removed vertex are orphaned in place at their
    /// last absolute position, never deleted.
    fn remove_item(&mut self, id: ItemId) -> Vec<ItemId> {
        let mut removed = Vec::new();
        let Some(kind) = self.items.get(id.0).map(Item::kind) else {
            return removed;
        };
        match kind {
            ItemKind::Edge => self.remove_edge(id, &mut removed),
            ItemKind::Label => {
                let owner = self.label(id).map(|label| label.owner);
                if let Some(owner) = owner {
                    match self.items.get_mut(owner.0) {
                        Some(Item::Node(node)) => node.label = None,
                        Some(Item::Edge(edge)) => edge.label = None,
                        _ => {}
                    }
                }
                self.delete(id, &mut removed);
            }
            ItemKind::Bezier => self.delete(id, &mut removed),
            ItemKind::Vertex | ItemKind::Node => {
                let incident = self
                    .vertex(id)
                    .map(|vertex| vertex.edges.values().copied().collect_vec())
                    .unwrap_or_default();
                for edge in incident {
                    self.remove_edge(edge, &mut removed);
                }
                let label = self.items.get(id.0).and_then(|item| item.label_id());
                if let Some(label) = label {
                    self.delete(label, &mut removed);
                }
                self.delete(id, &mut removed);
            }
        }
        removed
    }
}

/// The scene: arena state, the settings context, and the binding
/// registry tying the two together.
pub struct GraphicsScene {
    state: Rc<RefCell<SceneState>>,
    settings: Rc<Settings>,
    binder: Binder,
    item_bindings: HashMap<ItemId, Vec<BindingId>>,
}

impl GraphicsScene {
    #[must_use]
    pub fn new(settings: Rc<Settings>) -> Self {
        Self {
            state: Rc::new(RefCell::new(SceneState::default())),
            settings,
            binder: Binder::new(),
            item_bindings: HashMap::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Rc<Settings> {
        &self.settings
    }

    /// Shared borrow of the item arena and interaction state.
    #[must_use]
    pub fn read(&self) -> Ref<'_, SceneState> {
        self.state.borrow()
    }

    pub fn create_vertex(&mut self, pos: Pos2) -> ItemId {
        let id = {
            let mut state = self.state.borrow_mut();
            state.insert(Item::Vertex(Vertex::new(pos, DEFAULT_VERTEX_RADIUS)))
        };
        self.bind_vertex(id);
        id
    }

    pub fn create_node(
        &mut self,
        pos: Pos2,
        radius: f32,
        name: &str,
        weights: IndexMap<String, u64>,
    ) -> ItemId {
        let (id, label) = {
            let mut state = self.state.borrow_mut();
            let id = state.insert(Item::Node(Node::new(pos, radius, name, weights)));
            let label = state.insert(Item::Label(Label::new(id, name, pos)));
            if let Some(node) = state.node_mut(id) {
                node.label = Some(label);
            }
            (id, label)
        };
        self.bind_node(id, label);
        id
    }

    pub fn add_bezier(&mut self, p1: Pos2, p2: Pos2) -> ItemId {
        self.state
            .borrow_mut()
            .insert(Item::Bezier(BezierCurve::new(p1, p2)))
    }

    /// Connects `child` under `parent` with a tree edge. Fails without
    /// mutation when the child is already parented, the vertices are
    /// already connected, or `parent == child`.
    pub fn add_child(
        &mut self,
        parent: ItemId,
        child: ItemId,
        segments: u32,
    ) -> Result<ItemId, SceneError> {
        let (edge, label) = {
            let mut state = self.state.borrow_mut();
            state.check_link(parent, child)?;
            if state.vertex(child).is_some_and(|vertex| vertex.parent.is_some()) {
                return Err(SceneError::AlreadyParented);
            }
            let edge = state.insert(Item::Edge(Edge::new(parent, child, segments)));
            let label = state.insert_edge_label(edge, segments);
            if let Some(vertex) = state.vertex_mut(child) {
                vertex.parent = Some(parent);
                vertex.edges.insert(parent, edge);
            }
            if let Some(vertex) = state.vertex_mut(parent) {
                vertex.children.push(child);
                vertex.edges.insert(child, edge);
            }
            state.adjust_edge(edge);
            (edge, label)
        };
        debug!(?parent, ?child, segments, "added tree edge");
        self.bind_edge(edge, label);
        Ok(edge)
    }

    /// Connects two vertices with a peer edge, registered symmetrically
    /// on both sides. The sibling graph may contain cycles.
    pub fn add_sibling(
        &mut self,
        first: ItemId,
        second: ItemId,
        segments: u32,
    ) -> Result<ItemId, SceneError> {
        let (edge, label) = {
            let mut state = self.state.borrow_mut();
            state.check_link(first, second)?;
            let edge = state.insert(Item::Edge(Edge::new(first, second, segments)));
            let label = state.insert_edge_label(edge, segments);
            if let Some(vertex) = state.vertex_mut(first) {
                vertex.siblings.push(second);
                vertex.edges.insert(second, edge);
            }
            if let Some(vertex) = state.vertex_mut(second) {
                vertex.siblings.push(first);
                vertex.edges.insert(first, edge);
            }
            state.adjust_edge(edge);
            (edge, label)
        };
        debug!(?first, ?second, segments, "added peer edge");
        self.bind_edge(edge, label);
        Ok(edge)
    }

    /// Removes an item with its cascade and releases the settings
    /// bindings of everything that went away.
    pub fn remove(&mut self, id: ItemId) {
        let removed = self.state.borrow_mut().remove_item(id);
        debug!(?id, cascade = removed.len(), "removed item");
        for id in removed {
            if let Some(bindings) = self.item_bindings.remove(&id) {
                for binding in bindings {
                    self.binder.unbind(binding);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        {
            let mut state = self.state.borrow_mut();
            state.items.clear();
            state.order.clear();
            state.hovered = None;
            state.grabbed = None;
            state.highlighted_edge = None;
            state.drag = None;
        }
        self.binder.unbind_all();
        self.item_bindings.clear();
    }

    /// Clears hover, grab and drag state ahead of an export.
    pub fn clear_transient(&mut self) {
        self.state.borrow_mut().clear_transient();
    }

    pub fn pointer_move(&mut self, pos: Pos2) {
        let ignore_labels = !self.settings.label_movement.get();
        let mut state = self.state.borrow_mut();
        if state.drag.is_some() {
            state.drag_to(pos);
            return;
        }
        let hit = state.item_at_pos(pos, false, ignore_labels);
        state.set_hovered(hit);
        state.update_highlighted_edge();
    }

    pub fn pointer_press(&mut self, pos: Pos2) {
        let ignore_labels = !self.settings.label_movement.get();
        let mut state = self.state.borrow_mut();
        // A second press without a release drops the stale grab first.
        if let Some(old) = state.grabbed.take() {
            state.set_item_pressed(old, false);
            state.drag = None;
        }
        let Some(hit) = state.item_at_pos(pos, true, ignore_labels) else {
            state.update_highlighted_edge();
            return;
        };
        let Some(drag) = state.begin_drag(hit, pos) else {
            state.update_highlighted_edge();
            return;
        };
        state.drag = Some(drag);
        state.grabbed = Some(hit);
        state.set_item_pressed(hit, true);
        state.update_highlighted_edge();
    }

    pub fn pointer_release(&mut self, pos: Pos2) {
        {
            let mut state = self.state.borrow_mut();
            if let Some(grabbed) = state.grabbed.take() {
                state.set_item_pressed(grabbed, false);
            }
            state.drag = None;
        }
        self.pointer_move(pos);
    }

    /// Pointer left the scene bounds: hover is forced off, but an
    /// in-flight grab keeps routing motion until the button release.
    pub fn pointer_leave(&mut self) {
        let mut state = self.state.borrow_mut();
        state.set_hovered(None);
        state.update_highlighted_edge();
    }

    pub fn double_click(&mut self, pos: Pos2) {
        let ignore_labels = !self.settings.label_movement.get();
        let mut state = self.state.borrow_mut();
        let Some(hit) = state.item_at_pos(pos, false, ignore_labels) else {
            return;
        };
        match state.items[hit.0].kind() {
            ItemKind::Edge => {
                let next = state.edge(hit).map(|edge| edge.style.next());
                if let Some(next) = next {
                    state.set_edge_style(hit, next);
                }
            }
            ItemKind::Label => {
                if let Some(label) = state.label_mut(hit) {
                    label.recenter();
                }
            }
            ItemKind::Node => {
                let label = state.node(hit).and_then(|node| node.label);
                if let Some(label) = label.and_then(|label| state.label_mut(label)) {
                    label.recenter();
                }
            }
            ItemKind::Bezier => {
                if let Some(bezier) = state.bezier_mut(hit) {
                    bezier.show_handles = !bezier.show_handles;
                }
            }
            ItemKind::Vertex => {}
        }
    }

    /// Applies `default` to every edge, or its collapsed counterpart
    /// past the segment cutoff. A cutoff of zero disables collapsing.
    pub fn style_edges(&mut self, default: EdgeStyle, cutoff: u32) {
        debug!(?default, cutoff, "styling edges");
        let mut state = self.state.borrow_mut();
        for id in state.ids_of(ItemKind::Edge) {
            let Some(segments) = state.edge(id).map(|edge| edge.segments) else {
                continue;
            };
            let style = if cutoff > 0 && segments > cutoff {
                default.collapsed_counterpart()
            } else {
                default
            };
            state.set_edge_style(id, style);
        }
    }

    /// Re-derives every node radius from its total weight via the
    /// six-coefficient formula, then re-routes all edges.
    pub fn style_nodes(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        let mut state = self.state.borrow_mut();
        for id in state.ids_of(ItemKind::Node) {
            let Some(node) = state.node_mut(id) else { continue };
            let weight = node.total_weight() as f32;
            node.vertex.radius = a + b * weight.powf(c) + d * (1.0 + weight).ln() + e * weight + f;
        }
        for id in state.ids_of(ItemKind::Edge) {
            state.adjust_edge(id);
        }
    }

    /// Substitutes the `NAME`/`WEIGHT` tokens of the templates into
    /// every node and edge label.
    pub fn style_labels(&mut self, node_template: &str, edge_template: &str) {
        let mut state = self.state.borrow_mut();
        let nodes = state
            .ids_of(ItemKind::Node)
            .into_iter()
            .filter_map(|id| {
                let node = state.node(id)?;
                let text = node_template
                    .replace("NAME", &node.name)
                    .replace("WEIGHT", &node.total_weight().to_string());
                Some((node.label?, text))
            })
            .collect_vec();
        let edges = state
            .ids_of(ItemKind::Edge)
            .into_iter()
            .filter_map(|id| {
                let edge = state.edge(id)?;
                let text = edge_template.replace("WEIGHT", &edge.segments.to_string());
                Some((edge.label?, text))
            })
            .collect_vec();
        for (label, text) in nodes.into_iter().chain(edges) {
            if let Some(label) = state.label_mut(label) {
                label.set_text(&text);
            }
        }
    }

    /// [`Self::style_nodes`] with the coefficients currently held in
    /// the settings context.
    pub fn apply_node_style_settings(&mut self) {
        let (a, b, c) = (
            self.settings.node_a.get(),
            self.settings.node_b.get(),
            self.settings.node_c.get(),
        );
        let (d, e, f) = (
            self.settings.node_d.get(),
            self.settings.node_e.get(),
            self.settings.node_f.get(),
        );
        self.style_nodes(a, b, c, d, e, f);
    }

    /// [`Self::style_labels`] with the templates currently held in the
    /// settings context.
    pub fn apply_label_templates(&mut self) {
        let node_template = self.settings.node_label_template.get();
        let edge_template = self.settings.edge_label_template.get();
        self.style_labels(&node_template, &edge_template);
    }

    fn bind_state<T: Clone + 'static>(
        &mut self,
        id: ItemId,
        property: Property<T>,
        apply: impl Fn(&mut SceneState, &T) + 'static,
    ) {
        let weak = Rc::downgrade(&self.state);
        let binding = self.binder.bind(&property, move |value| {
            apply_to_state(&weak, value, &apply);
        });
        self.item_bindings.entry(id).or_default().push(binding);
    }

    fn bind_vertex(&mut self, id: ItemId) {
        self.bind_state(id, self.settings.rotational_movement.clone(), move |state, value| {
            if let Some(vertex) = state.vertex_mut(id) {
                vertex.rotational = *value;
            }
        });
        self.bind_state(id, self.settings.recursive_movement.clone(), move |state, value| {
            if let Some(vertex) = state.vertex_mut(id) {
                vertex.recursive = *value;
            }
        });
        self.bind_state(id, self.settings.highlight_color.clone(), move |state, value| {
            if let Some(vertex) = state.vertex_mut(id) {
                vertex.highlight_color = *value;
            }
        });
    }

    fn bind_node(&mut self, id: ItemId, label: ItemId) {
        self.bind_vertex(id);
        self.bind_state(id, self.settings.color_map_changed(), move |state, map| {
            if let Some(node) = state.node_mut(id) {
                node.update_colors(map);
            }
        });
        self.bind_label(label);
    }

    fn bind_edge(&mut self, id: ItemId, label: ItemId) {
        self.bind_state(id, self.settings.highlight_color.clone(), move |state, value| {
            if let Some(edge) = state.edge_mut(id) {
                edge.highlight_color = *value;
            }
        });
        self.bind_label(label);
    }

    // Label bindings are keyed under the label itself, so they die
    // with it even when the label is removed on its own.
    fn bind_label(&mut self, label: ItemId) {
        self.bind_state(label, self.settings.label_movement.clone(), move |state, value| {
            if let Some(label) = state.label_mut(label) {
                label.locked = !*value;
            }
        });
        self.bind_state(label, self.settings.highlight_color.clone(), move |state, value: &Color32| {
            if let Some(label) = state.label_mut(label) {
                label.highlight_color = *value;
            }
        });
    }
}

fn apply_to_state<T>(
    weak: &Weak<RefCell<SceneState>>,
    value: &T,
    apply: &impl Fn(&mut SceneState, &T),
) {
    let Some(state) = weak.upgrade() else { return };
    match state.try_borrow_mut() {
        Ok(mut state) => apply(&mut state, value),
        Err(_) => warn!("scene is mid-mutation, dropping settings notification"),
    }
}

fn distance_to_segment(point: Pos2, p1: Pos2, p2: Pos2) -> f32 {
    let segment = p2 - p1;
    let length_sq = segment.length_sq();
    if length_sq == 0.0 {
        return p1.distance(point);
    }
    let t = ((point - p1).dot(segment) / length_sq).clamp(0.0, 1.0);
    (p1 + segment * t).distance(point)
}

/// Perpendicular distance from `point` to the infinite line through
/// `p1` and `p2`.
fn distance_to_line(point: Pos2, p1: Pos2, p2: Pos2) -> f32 {
    let line = p2 - p1;
    let length = line.length();
    if length == 0.0 {
        return p1.distance(point);
    }
    ((point.x - p1.x) * line.y - (point.y - p1.y) * line.x).abs() / length
}
