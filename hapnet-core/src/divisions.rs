//! Category divisions and their palette-derived colour map.

use egui::Color32;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::{
    bindings::Property,
    palette::{ColorParseError, Palette, parse_color},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DivisionError {
    #[error(transparent)]
    Color(#[from] ColorParseError),
    #[error("no division at index {0}")]
    Index(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Division {
    pub key: String,
    pub color: Color32,
}

/// A total function from category key to colour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorMap {
    colors: IndexMap<String, Color32>,
    default: Color32,
}

impl ColorMap {
    #[must_use]
    pub fn new(default: Color32) -> Self {
        Self {
            colors: IndexMap::new(),
            default,
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Color32 {
        self.colors.get(key).copied().unwrap_or(self.default)
    }

    #[must_use]
    pub fn default_color(&self) -> Color32 {
        self.default
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for ColorMap {
    fn default() -> Self {
        Self::new(Color32::BLACK)
    }
}

/// Ordered list of divisions, coloured by palette index. Every
/// successful mutation publishes a fresh [`ColorMap`] snapshot through
/// [`DivisionList::color_map_changed`] before returning.
pub struct DivisionList {
    palette: Palette,
    divisions: Vec<Division>,
    color_map_changed: Property<ColorMap>,
}

impl DivisionList {
    #[must_use]
    pub fn new(palette: Palette) -> Self {
        let color_map_changed = Property::new(ColorMap::new(palette.default));
        Self {
            palette,
            divisions: Vec::new(),
            color_map_changed,
        }
    }

    #[must_use]
    pub fn divisions(&self) -> &[Division] {
        &self.divisions
    }

    /// Handle to the change notification channel. Cloning shares the
    /// underlying slot, so subscribers survive borrows of the list.
    #[must_use]
    pub fn color_map_changed(&self) -> Property<ColorMap> {
        self.color_map_changed.clone()
    }

    /// Rebuilds the division list by zipping `keys` with palette
    /// colours by index. Duplicate keys collide silently in the map.
    pub fn set_keys<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.divisions = keys
            .into_iter()
            .enumerate()
            .map(|(index, key)| Division {
                key: key.into(),
                color: self.palette.color(index),
            })
            .collect();
        debug!(divisions = self.divisions.len(), "division keys reset");
        self.publish();
    }

    /// Re-colours every division by index from `palette`, preserving
    /// keys, and updates the fallback colour.
    pub fn set_palette(&mut self, palette: Palette) {
        for (index, division) in self.divisions.iter_mut().enumerate() {
            division.color = palette.color(index);
        }
        debug!(palette = palette.label, "divisions re-coloured");
        self.palette = palette;
        self.publish();
    }

    /// Re-colours one division from a colour string. Fails without
    /// mutating on a malformed string or an out-of-range index.
    pub fn set_color(&mut self, index: usize, color: &str) -> Result<(), DivisionError> {
        let parsed = parse_color(color)?;
        let division = self
            .divisions
            .get_mut(index)
            .ok_or(DivisionError::Index(index))?;
        division.color = parsed;
        self.publish();
        Ok(())
    }

    /// Pure snapshot of the current key to colour mapping.
    #[must_use]
    pub fn get_color_map(&self) -> ColorMap {
        ColorMap {
            colors: self
                .divisions
                .iter()
                .map(|division| (division.key.clone(), division.color))
                .collect(),
            default: self.palette.default,
        }
    }

    fn publish(&self) {
        self.color_map_changed.set(self.get_color_map());
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::bindings::Binder;

    #[test]
    fn keys_map_to_palette_colors_by_index() {
        let mut divisions = DivisionList::new(Palette::spring());
        divisions.set_keys(["X", "Y", "Z"]);
        divisions.set_palette(Palette::set1());

        let palette = Palette::set1();
        let map = divisions.get_color_map();
        assert_eq!(map.get("X"), palette.color(0));
        assert_eq!(map.get("Y"), palette.color(1));
        assert_eq!(map.get("Z"), palette.color(2));
        assert_eq!(map.get("missing"), palette.default);
    }

    #[test]
    fn palette_swap_preserves_keys() {
        let mut divisions = DivisionList::new(Palette::spring());
        divisions.set_keys(["A", "B"]);
        divisions.set_palette(Palette::tab10());
        let keys: Vec<_> = divisions.divisions().iter().map(|d| d.key.clone()).collect();
        assert_eq!(keys, ["A", "B"]);
    }

    #[test]
    fn invalid_color_leaves_map_unchanged() {
        let mut divisions = DivisionList::new(Palette::spring());
        divisions.set_keys(["A"]);
        let before = divisions.get_color_map();
        assert!(divisions.set_color(0, "zzzzzz").is_err());
        assert_eq!(divisions.get_color_map(), before);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut divisions = DivisionList::new(Palette::spring());
        divisions.set_keys(["A"]);
        assert_eq!(
            divisions.set_color(3, "aabbcc"),
            Err(DivisionError::Index(3))
        );
    }

    #[test]
    fn valid_edit_accepts_either_marker_form() {
        let mut divisions = DivisionList::new(Palette::spring());
        divisions.set_keys(["A", "B"]);
        divisions.set_color(0, "#102030").unwrap();
        divisions.set_color(1, "405060").unwrap();
        let map = divisions.get_color_map();
        assert_eq!(map.get("A"), Color32::from_rgb(0x10, 0x20, 0x30));
        assert_eq!(map.get("B"), Color32::from_rgb(0x40, 0x50, 0x60));
    }

    #[test]
    fn mutations_publish_snapshots_synchronously() {
        let mut divisions = DivisionList::new(Palette::spring());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut binder = Binder::new();
        let sink = Rc::clone(&seen);
        binder.bind(&divisions.color_map_changed(), move |map: &ColorMap| {
            sink.borrow_mut().push(map.clone());
        });
        seen.borrow_mut().clear();

        divisions.set_keys(["A"]);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].get("A"), Palette::spring().color(0));

        divisions.set_color(0, "#112233").unwrap();
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(
            seen.borrow()[1].get("A"),
            Color32::from_rgb(0x11, 0x22, 0x33)
        );
    }
}
