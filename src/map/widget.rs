//! Slippy map widget: tiles, pan/zoom interaction, markers
//!
//! The widget owns its camera. Every completed move (end of a drag, a zoom step,
//! the end of a flight, an instant jump) is reported once as
//! [`MapEvent::MoveEnded`] carrying the new center.

use super::projection::{self, TILE_SIZE_PX};
use super::tiles::TileCache;
use crate::constants::*;
use crate::theme;
use crate::types::{Camera, PointId, Position};
use crate::utils::{rasterize_svg, PIN_SVG};
use eframe::egui;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerId {
    Point(PointId),
    /// Position found by "Find My Location"
    UserLocation,
    /// Position found by the location tracker on startup
    Tracked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStyle {
    Pin,
    Dot,
}

#[derive(Debug, Clone)]
pub struct MapMarker {
    pub id: MarkerId,
    pub position: Position,
    pub style: MarkerStyle,
    pub color: egui::Color32,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    MoveEnded { center: Position, zoom: u8 },
    MarkerClicked(MarkerId),
}

/// Result of drawing the map for one frame
pub struct MapOutput {
    pub events: Vec<MapEvent>,
    /// Marker whose popup is open, with the screen point the popup hangs from
    pub popup: Option<(MarkerId, egui::Pos2)>,
}

#[derive(Debug, Clone, Copy)]
struct Flight {
    from: Position,
    to: Position,
    start: f64,
    duration: f64,
}

impl Flight {
    /// Ease-out interpolation at time `now`; `None` once finished
    fn position_at(&self, now: f64) -> Option<Position> {
        let t = ((now - self.start) / self.duration).clamp(0.0, 1.0);
        if t >= 1.0 {
            return None;
        }
        let e = 1.0 - (1.0 - t).powi(3);
        // Shortest way round, across the antimeridian if that is closer
        let mut dlon = self.to.lon - self.from.lon;
        if dlon > 180.0 {
            dlon -= 360.0;
        } else if dlon < -180.0 {
            dlon += 360.0;
        }
        Some(Position::new(
            self.from.lat + (self.to.lat - self.from.lat) * e,
            projection::normalize_lon(self.from.lon + dlon * e),
        ))
    }
}

const PIN_SIZE: egui::Vec2 = egui::vec2(25.0, 41.0);
const DOT_RADIUS: f32 = 7.0;
// Farther targets are jumped to instead of animated
const MAX_FLY_DISTANCE_PX: f64 = 4000.0;
// Scroll distance in points that makes one zoom level
const SCROLL_PER_LEVEL: f32 = 40.0;

pub struct MapView {
    center: Position,
    zoom: u8,
    flight: Option<Flight>,
    open_popup: Option<MarkerId>,
    pin_texture: Option<egui::TextureHandle>,
    // Fractional zoom levels from wheel, trackpad and pinch input
    zoom_accum: f32,
}

impl MapView {
    pub fn new(camera: Camera) -> Self {
        Self {
            center: camera.center,
            zoom: camera.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            flight: None,
            open_popup: None,
            pin_texture: None,
            zoom_accum: 0.0,
        }
    }

    pub fn center(&self) -> Position {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn is_flying(&self) -> bool {
        self.flight.is_some()
    }

    pub fn close_popup(&mut self) {
        self.open_popup = None;
    }

    fn move_ended(&self) -> MapEvent {
        MapEvent::MoveEnded {
            center: self.center,
            zoom: self.zoom,
        }
    }

    /// Move instantly
    pub fn jump_to(&mut self, camera: Camera) -> MapEvent {
        self.flight = None;
        self.center = camera.center;
        self.zoom = camera.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.move_ended()
    }

    /// Animate to `camera`; the move ends in a later [`MapView::tick`]
    pub fn fly_to(&mut self, camera: Camera, now: f64) {
        self.zoom = camera.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.flight = Some(Flight {
            from: self.center,
            to: camera.center,
            start: now,
            duration: FLY_DURATION_SECS,
        });
    }

    /// Fly to `camera`, or jump there when it is too far away to animate.
    /// A jump ends immediately and returns its move event.
    pub fn move_to(&mut self, camera: Camera, now: f64) -> Option<MapEvent> {
        let zoom = camera.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let (dx, dy) = projection::screen_offset(camera.center, self.center, zoom);
        if dx.hypot(dy) > MAX_FLY_DISTANCE_PX {
            Some(self.jump_to(camera))
        } else {
            self.fly_to(camera, now);
            None
        }
    }

    /// Advance a running flight
    pub fn tick(&mut self, now: f64) -> Option<MapEvent> {
        let flight = self.flight?;
        match flight.position_at(now) {
            Some(pos) => {
                self.center = pos;
                None
            }
            None => {
                self.flight = None;
                self.center = flight.to;
                Some(self.move_ended())
            }
        }
    }

    /// Shift the content by a drag delta in pixels; the move continues until
    /// [`MapView::finish_drag`]
    pub fn drag_by(&mut self, delta: (f64, f64)) {
        self.flight = None;
        self.center = projection::pan(self.center, self.zoom, delta);
    }

    pub fn finish_drag(&mut self) -> MapEvent {
        self.move_ended()
    }

    /// Add fractional zoom input and return the whole levels it completes.
    /// Reversing direction drops what was accumulated the other way.
    fn accumulate_zoom(&mut self, levels: f32) -> i32 {
        if levels == 0.0 {
            return 0;
        }
        if self.zoom_accum != 0.0 && levels.signum() != self.zoom_accum.signum() {
            self.zoom_accum = 0.0;
        }
        self.zoom_accum += levels;
        let steps = self.zoom_accum.trunc();
        self.zoom_accum -= steps;
        steps as i32
    }

    /// Zoom one or more levels keeping the point under `anchor` fixed.
    /// Returns `None` when already at the limit.
    pub fn zoom_by(&mut self, steps: i32, anchor: (f64, f64)) -> Option<MapEvent> {
        let target = (self.zoom as i32 + steps).clamp(MIN_ZOOM as i32, MAX_ZOOM as i32) as u8;
        if target == self.zoom {
            return None;
        }
        if let Some(flight) = self.flight.take() {
            self.center = flight.to;
        }
        self.center = projection::zoom_around(self.center, self.zoom, target, anchor);
        self.zoom = target;
        Some(self.move_ended())
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        tiles: &mut TileCache,
        markers: &[MapMarker],
    ) -> MapOutput {
        let mut events = Vec::new();
        let ctx = ui.ctx().clone();
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());

        let now = ui.input(|i| i.time);
        if let Some(ev) = self.tick(now) {
            events.push(ev);
        }
        if self.is_flying() {
            ctx.request_repaint();
        }

        // Pan
        if response.dragged() {
            let d = response.drag_delta();
            if d != egui::Vec2::ZERO {
                self.drag_by((d.x as f64, d.y as f64));
            }
            ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if response.hovered() {
            ctx.set_cursor_icon(egui::CursorIcon::Grab);
        }
        if response.drag_stopped() {
            events.push(self.finish_drag());
        }

        // Wheel zoom around the pointer
        if response.hovered() {
            let (scroll, pinch) = ui.input(|i| (i.raw_scroll_delta.y, i.zoom_delta()));
            let steps = self.accumulate_zoom(scroll / SCROLL_PER_LEVEL + pinch.log2());
            if steps != 0 {
                let anchor = response
                    .hover_pos()
                    .map(|p| p - rect.center())
                    .unwrap_or(egui::Vec2::ZERO);
                if let Some(ev) = self.zoom_by(steps, (anchor.x as f64, anchor.y as f64)) {
                    events.push(ev);
                }
            }
        }

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, theme::MAP_BACKGROUND);
        self.paint_tiles(&ctx, &painter, rect, tiles);

        // Markers: selected ones drawn last so they sit on top
        let pin = self.pin_texture(&ctx);
        let mut clicked_marker = false;
        let mut popup = None;
        let mut ordered: Vec<&MapMarker> = markers.iter().collect();
        ordered.sort_by_key(|m| m.selected);
        for marker in ordered {
            let (dx, dy) = projection::screen_offset(marker.position, self.center, self.zoom);
            let at = rect.center() + egui::vec2(dx as f32, dy as f32);
            if !rect.expand(PIN_SIZE.y).contains(at) {
                continue;
            }
            let (hit_rect, popup_anchor) = paint_marker(&painter, marker, at, pin.as_ref());
            let hit = ui.interact(hit_rect, ui.id().with(("marker", marker.id)), egui::Sense::click());
            if hit.hovered() {
                ctx.set_cursor_icon(egui::CursorIcon::PointingHand);
            }
            if hit.clicked() {
                clicked_marker = true;
                self.open_popup = Some(marker.id);
                events.push(MapEvent::MarkerClicked(marker.id));
            }
            if self.open_popup == Some(marker.id) {
                popup = Some((marker.id, popup_anchor));
            }
        }
        if response.clicked() && !clicked_marker {
            self.open_popup = None;
        }

        if let Some(ev) = self.zoom_controls(ui, rect) {
            events.push(ev);
        }
        self.attribution(ui, rect, tiles);

        MapOutput { events, popup }
    }

    fn paint_tiles(&self, ctx: &egui::Context, painter: &egui::Painter, rect: egui::Rect, tiles: &mut TileCache) {
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        let size = (rect.width() as f64, rect.height() as f64);
        for placement in projection::visible_tiles(self.center, self.zoom, size) {
            let min = rect.min + egui::vec2(placement.offset.0 as f32, placement.offset.1 as f32);
            let tile_rect = egui::Rect::from_min_size(min, egui::vec2(TILE_SIZE_PX, TILE_SIZE_PX));
            match tiles.get(ctx, placement.tile) {
                Some(tex) => {
                    painter.image(tex.id(), tile_rect, uv, egui::Color32::WHITE);
                }
                None => {
                    painter.rect_stroke(
                        tile_rect,
                        0.0,
                        egui::Stroke::new(theme::STROKE_DEFAULT, theme::BORDER_SUBTLE),
                        egui::StrokeKind::Inside,
                    );
                }
            }
        }
    }

    fn pin_texture(&mut self, ctx: &egui::Context) -> Option<egui::TextureHandle> {
        if self.pin_texture.is_none() {
            let ppp = ctx.pixels_per_point();
            match rasterize_svg(PIN_SVG, (PIN_SIZE.x * ppp * 2.0) as u32) {
                Some((pixels, w, h)) => {
                    self.pin_texture = Some(ctx.load_texture(
                        "map-pin",
                        egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], &pixels),
                        egui::TextureOptions::LINEAR,
                    ));
                }
                None => warn!("Failed to rasterize marker icon"),
            }
        }
        self.pin_texture.clone()
    }

    fn zoom_controls(&mut self, ui: &mut egui::Ui, rect: egui::Rect) -> Option<MapEvent> {
        let size = egui::vec2(30.0, 30.0);
        let origin = rect.min + egui::vec2(theme::SPACING_LG, theme::SPACING_LG);
        let plus = egui::Rect::from_min_size(origin, size);
        let minus = plus.translate(egui::vec2(0.0, size.y + theme::SPACING_SM));

        let mut event = None;
        let zoom_in = ui
            .put(plus, theme::button(egui_phosphor::regular::PLUS))
            .on_hover_text("Zoom in");
        if zoom_in.clicked() {
            event = self.zoom_by(1, (0.0, 0.0));
        }
        let zoom_out = ui
            .put(minus, theme::button(egui_phosphor::regular::MINUS))
            .on_hover_text("Zoom out");
        if zoom_out.clicked() {
            event = self.zoom_by(-1, (0.0, 0.0));
        }
        event
    }

    fn attribution(&self, ui: &mut egui::Ui, rect: egui::Rect, tiles: &TileCache) {
        let source = tiles.source();
        let painter = ui.painter_at(rect);
        let galley = painter.layout_no_wrap(
            source.attribution.clone(),
            egui::FontId::proportional(theme::FONT_SMALL),
            theme::TEXT_SECONDARY,
        );
        let pad = egui::vec2(6.0, 3.0);
        let box_rect = egui::Rect::from_min_size(
            rect.max - galley.size() - pad * 2.0,
            galley.size() + pad * 2.0,
        );
        let response = ui.interact(box_rect, ui.id().with("map_attribution"), egui::Sense::click());
        let fill = if response.hovered() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
            theme::OVERLAY_HOVER
        } else {
            theme::OVERLAY
        };
        painter.rect_filled(box_rect, theme::RADIUS_SMALL, fill);
        painter.galley(box_rect.min + pad, galley, theme::TEXT_SECONDARY);
        if response.clicked() && !source.attribution_url.is_empty() {
            if let Err(e) = open::that(&source.attribution_url) {
                warn!(error = %e, url = %source.attribution_url, "Failed to open attribution link");
            }
        }
    }
}

/// Paint one marker at `at`. Returns its hit rect and the point a popup hangs from.
fn paint_marker(
    painter: &egui::Painter,
    marker: &MapMarker,
    at: egui::Pos2,
    pin: Option<&egui::TextureHandle>,
) -> (egui::Rect, egui::Pos2) {
    match (marker.style, pin) {
        (MarkerStyle::Pin, Some(tex)) => {
            let scale = if marker.selected { 1.2 } else { 1.0 };
            let size = PIN_SIZE * scale;
            // Icon anchor is the tip of the pin
            let pin_rect = egui::Rect::from_min_size(at - egui::vec2(size.x / 2.0, size.y), size);
            let tint = if marker.selected { theme::ACCENT } else { marker.color };
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            painter.image(tex.id(), pin_rect, uv, tint);
            (pin_rect, pin_rect.center_top())
        }
        _ => {
            let r = if marker.selected { DOT_RADIUS + 2.0 } else { DOT_RADIUS };
            painter.circle_filled(at, r + 6.0, marker.color.gamma_multiply(0.25));
            painter.circle_filled(at, r, marker.color);
            painter.circle_stroke(at, r, egui::Stroke::new(theme::STROKE_THICK, egui::Color32::WHITE));
            let hit = egui::Rect::from_center_size(at, egui::vec2(r * 2.0 + 6.0, r * 2.0 + 6.0));
            (hit, at - egui::vec2(0.0, r))
        }
    }
}
