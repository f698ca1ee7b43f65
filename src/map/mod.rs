//! Map widget - tile map with markers, pan/zoom and move events

pub mod projection;
pub mod tiles;
pub mod widget;

pub use tiles::{TileCache, TileSource};
pub use widget::{MapEvent, MapMarker, MapView, MarkerId, MarkerStyle};
