use egui::{Color32, pos2, vec2};
use hapnet_core::scene::GraphicsScene;
use hapnet_core::settings::Settings;
use hapnet_graphics::view::{RASTER_SIZE, SurfaceError, View};
use indexmap::IndexMap;

fn scene() -> GraphicsScene {
    GraphicsScene::new(Settings::new())
}

fn node(scene: &mut GraphicsScene, x: f32, y: f32, name: &str, weight: u64) -> hapnet_core::items::ItemId {
    let mut weights = IndexMap::new();
    weights.insert(name.to_owned(), weight);
    scene.create_node(pos2(x, y), 10.0, name, weights)
}

#[test]
fn exports_drop_transient_pointer_state() {
    let mut scene = scene();
    node(&mut scene, 0.0, 0.0, "a", 4);
    scene.pointer_move(pos2(0.0, 0.0));
    scene.pointer_press(pos2(0.0, 0.0));
    assert!(scene.read().grabbed().is_some());

    let view = View::new();
    let _ = view.export_svg(&mut scene);

    let state = scene.read();
    assert_eq!(state.grabbed(), None);
    assert_eq!(state.hovered(), None);
}

#[test]
fn svg_documents_describe_the_network() {
    let mut scene = scene();
    let parent = node(&mut scene, 0.0, 0.0, "alpha", 4);
    let child = node(&mut scene, 60.0, 0.0, "beta", 2);
    scene.add_child(parent, child, 3).unwrap();

    let rendered = View::new().export_svg(&mut scene).to_string();
    assert!(rendered.contains("viewBox"));
    assert!(rendered.contains("<circle"));
    assert!(rendered.contains("<line"));
    assert!(rendered.contains("alpha"));
}

#[test]
fn raster_exports_use_a_white_canvas() {
    let mut scene = scene();
    node(&mut scene, 0.0, 0.0, "a", 1);

    let raster = View::new().export_raster(&mut scene);
    assert_eq!(raster.size(), RASTER_SIZE);
    assert_eq!(raster.background(), Color32::WHITE);
    assert!(!raster.shapes().is_empty());
}

#[test]
fn page_sizes_must_be_positive() {
    let mut scene = scene();
    node(&mut scene, 0.0, 0.0, "a", 1);

    let result = View::new().export_paged(&mut scene, vec2(0.0, 100.0));
    assert!(matches!(result, Err(SurfaceError::InvalidPageSize { .. })));
}

#[test]
fn tall_scenes_split_across_pages() {
    let mut scene = scene();
    node(&mut scene, 0.0, 0.0, "top", 1);
    node(&mut scene, 0.0, 300.0, "bottom", 1);

    let page = vec2(100.0, 50.0);
    let paged = View::new().export_paged(&mut scene, page).unwrap();
    assert!(paged.pages().len() > 1);

    // Every shape on a page must actually touch that page's strip.
    for shapes in paged.pages() {
        for shape in shapes {
            let bounds = shape.bounding_box();
            assert!(bounds.max.y >= 0.0 && bounds.min.y <= page.y);
        }
    }
}
