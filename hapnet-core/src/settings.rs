//! The session-wide settings context.
//!
//! One [`Settings`] is created per session and shared as `Rc`; every
//! graphical object holds subscribe access only, never a copy that
//! could drift. Writes publish synchronously through [`Property`].

use std::{cell::RefCell, rc::Rc};

use egui::Color32;

use crate::{
    bindings::{Binder, Property},
    divisions::{ColorMap, DivisionList},
    palette::Palette,
};

pub struct Settings {
    pub palette: Property<Palette>,
    pub divisions: Rc<RefCell<DivisionList>>,
    pub highlight_color: Property<Color32>,
    pub rotational_movement: Property<bool>,
    pub recursive_movement: Property<bool>,
    pub label_movement: Property<bool>,

    pub node_a: Property<f32>,
    pub node_b: Property<f32>,
    pub node_c: Property<f32>,
    pub node_d: Property<f32>,
    pub node_e: Property<f32>,
    pub node_f: Property<f32>,

    pub node_label_template: Property<String>,
    pub edge_label_template: Property<String>,

    // Keeps the palette cascade alive for the session.
    _binder: RefCell<Binder>,
}

impl Settings {
    #[must_use]
    pub fn new() -> Rc<Self> {
        let palette = Property::new(Palette::spring());
        let divisions = Rc::new(RefCell::new(DivisionList::new(Palette::spring())));
        let highlight_color = Property::new(Palette::spring().highlight);

        // One palette write cascades into divisions and the highlight
        // colour before `set` returns.
        let mut binder = Binder::new();
        {
            let divisions = Rc::clone(&divisions);
            binder.bind(&palette, move |palette: &Palette| {
                divisions.borrow_mut().set_palette(palette.clone());
            });
        }
        {
            let highlight_color = highlight_color.clone();
            binder.bind(&palette, move |palette: &Palette| {
                highlight_color.set(palette.highlight);
            });
        }

        Rc::new(Self {
            palette,
            divisions,
            highlight_color,
            rotational_movement: Property::new(true),
            recursive_movement: Property::new(true),
            label_movement: Property::new(false),
            node_a: Property::new(10.0),
            node_b: Property::new(2.0),
            node_c: Property::new(0.2),
            node_d: Property::new(1.0),
            node_e: Property::new(0.0),
            node_f: Property::new(0.0),
            node_label_template: Property::new("NAME".to_owned()),
            edge_label_template: Property::new("(WEIGHT)".to_owned()),
            _binder: RefCell::new(binder),
        })
    }

    /// Change-notification handle for the division colour map.
    #[must_use]
    pub fn color_map_changed(&self) -> Property<ColorMap> {
        self.divisions.borrow().color_map_changed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::Binder;

    #[test]
    fn palette_write_cascades_highlight_and_divisions() {
        let settings = Settings::new();
        settings.divisions.borrow_mut().set_keys(["X", "Y"]);

        settings.palette.set(Palette::set1());

        let set1 = Palette::set1();
        assert_eq!(settings.highlight_color.get(), set1.highlight);
        let map = settings.divisions.borrow().get_color_map();
        assert_eq!(map.get("X"), set1.color(0));
        assert_eq!(map.get("Y"), set1.color(1));
        assert_eq!(map.get("other"), set1.default);
    }

    #[test]
    fn cascade_is_synchronous_within_one_write() {
        let settings = Settings::new();
        settings.divisions.borrow_mut().set_keys(["X"]);

        let mut binder = Binder::new();
        let observed = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = std::rc::Rc::clone(&observed);
        binder.bind(&settings.color_map_changed(), move |map: &ColorMap| {
            sink.borrow_mut().push(map.get("X"));
        });
        observed.borrow_mut().clear();

        settings.palette.set(Palette::tab10());
        // The divisions snapshot arrived during the palette write.
        assert_eq!(*observed.borrow(), vec![Palette::tab10().color(0)]);
    }

    #[test]
    fn defaults_match_the_session_contract() {
        let settings = Settings::new();
        assert!(settings.rotational_movement.get());
        assert!(settings.recursive_movement.get());
        assert!(!settings.label_movement.get());
        assert_eq!(settings.node_label_template.get(), "NAME");
        assert_eq!(settings.edge_label_template.get(), "(WEIGHT)");
        assert_eq!(settings.highlight_color.get(), Palette::spring().highlight);
    }
}
