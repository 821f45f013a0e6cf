pub mod bindings;
pub mod divisions;
pub mod items;
pub mod palette;
pub mod scene;
pub mod settings;
