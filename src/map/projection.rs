//! Web Mercator projection and tile addressing
//!
//! World coordinates are pixels at a given zoom: the whole world is a square of
//! `TILE_SIZE * 2^zoom` pixels with the origin at the top-left (180°W, ~85°N).
//! Everything here is f64; f32 runs out of precision past zoom 16.

use crate::constants::TILE_SIZE;
use crate::types::Position;
use std::f64::consts::PI;

/// Latitude limit of the square Mercator world
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Tile edge in screen points
pub const TILE_SIZE_PX: f32 = TILE_SIZE as f32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

/// A tile and where its top-left corner lands, relative to the viewport's top-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub tile: TileId,
    pub offset: (f64, f64),
}

pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * 2f64.powi(zoom as i32)
}

pub fn project(pos: Position, zoom: u8) -> WorldPoint {
    let size = world_size(zoom);
    let lat = pos.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (pos.lon + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    WorldPoint { x, y }
}

pub fn unproject(p: WorldPoint, zoom: u8) -> Position {
    let size = world_size(zoom);
    let y = p.y.clamp(0.0, size);
    let lon = p.x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / size;
    let lat = n.sinh().atan().to_degrees();
    Position::new(lat, normalize_lon(lon))
}

/// Wrap a longitude into [-180, 180)
pub fn normalize_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Pixel offset of `pos` from the viewport center
pub fn screen_offset(pos: Position, center: Position, zoom: u8) -> (f64, f64) {
    let c = project(center, zoom);
    let p = project(pos, zoom);
    let size = world_size(zoom);
    // Take the copy of the world nearest to the center
    let mut dx = p.x - c.x;
    if dx > size / 2.0 {
        dx -= size;
    } else if dx < -size / 2.0 {
        dx += size;
    }
    (dx, p.y - c.y)
}

/// Geographic position under a pixel offset from the viewport center
pub fn position_at(center: Position, zoom: u8, offset: (f64, f64)) -> Position {
    let c = project(center, zoom);
    unproject(
        WorldPoint {
            x: c.x + offset.0,
            y: c.y + offset.1,
        },
        zoom,
    )
}

/// New center after the content was dragged by `delta` pixels
pub fn pan(center: Position, zoom: u8, delta: (f64, f64)) -> Position {
    position_at(center, zoom, (-delta.0, -delta.1))
}

/// New center after zooming so that the point under `anchor` stays put
pub fn zoom_around(center: Position, from: u8, to: u8, anchor: (f64, f64)) -> Position {
    let pinned = position_at(center, from, anchor);
    let p = project(pinned, to);
    unproject(
        WorldPoint {
            x: p.x - anchor.0,
            y: p.y - anchor.1,
        },
        to,
    )
}

/// Tiles covering a viewport of `size` pixels centered on `center`
pub fn visible_tiles(center: Position, zoom: u8, size: (f64, f64)) -> Vec<TilePlacement> {
    let c = project(center, zoom);
    let left = c.x - size.0 / 2.0;
    let top = c.y - size.1 / 2.0;
    let count = 1i64 << zoom;

    let min_tx = (left / TILE_SIZE).floor() as i64;
    let max_tx = ((left + size.0) / TILE_SIZE).ceil() as i64 - 1;
    let min_ty = ((top / TILE_SIZE).floor() as i64).max(0);
    let max_ty = ((((top + size.1) / TILE_SIZE).ceil() as i64) - 1).min(count - 1);

    let mut tiles = Vec::new();
    for ty in min_ty..=max_ty {
        for tx in min_tx..=max_tx {
            tiles.push(TilePlacement {
                tile: TileId {
                    zoom,
                    x: tx.rem_euclid(count) as u32,
                    y: ty as u32,
                },
                offset: (tx as f64 * TILE_SIZE - left, ty as f64 * TILE_SIZE - top),
            });
        }
    }
    tiles
}
