pub mod render;
pub mod shape;
pub mod svg;
pub mod view;
