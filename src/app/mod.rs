//! App module - application state and the handlers that feed the reducer

mod modals;
mod trackers;
mod views;

pub use trackers::{CenterTracker, LocationTracker};

use crate::location::{self, LocationProvider, Locator};
use crate::map::{MapEvent, MapMarker, MapView, MarkerId, MarkerStyle, TileCache, TileSource};
use crate::settings::Settings;
use crate::state::{Action, ViewerState};
use crate::theme;
use crate::types::*;
use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Failures while building the app before the first frame
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Add-infrastructure form while it is open
pub struct AddPointForm {
    /// Map center when the form was opened; the new point lands here
    pub at: Position,
    pub draft: PointDraft,
    pub focus_name: bool,
}

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    pub(crate) state: ViewerState,
    pub(crate) map: MapView,
    pub(crate) tiles: TileCache,
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) location_provider: Arc<dyn LocationProvider>,
    // "Find My Location" lookups
    pub(crate) locator: Locator,
    pub(crate) location_tracker: LocationTracker,
    pub(crate) center_tracker: CenterTracker,
    pub(crate) add_form: Option<AddPointForm>,
    pub(crate) scroll_to_selected: bool,
    // Window state
    pub(crate) window_pos: Option<egui::Pos2>,
    pub(crate) window_size: Option<egui::Vec2>,
    pub(crate) needs_center: bool,
    pub(crate) data_dir: PathBuf,
    pub(crate) settings: Settings,
}

// ============================================================================
// APP INITIALIZATION & HELPERS
// ============================================================================

impl App {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        data_dir: PathBuf,
    ) -> Result<Self, StartupError> {
        // Force dark theme
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        // Add Phosphor icons font
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        // Apply theme from theme.rs
        theme::apply_visuals(&cc.egui_ctx);

        let runtime = tokio::runtime::Runtime::new()?;
        let source = TileSource::new(
            settings.map.tile_url.clone(),
            settings.map.attribution.clone(),
            settings.map.attribution_url.clone(),
        );
        let tiles = TileCache::new(source, runtime.handle().clone())?;
        let location_provider = location::provider_from_settings(&settings.geolocation)?;
        info!(mode = ?settings.geolocation.mode, "Location provider ready");

        let (zoom, focus_zoom) = settings.map.zooms();
        let center = Position::new(settings.map.default_lat, settings.map.default_lon);
        let state = ViewerState::new(sample_infrastructure(), center, zoom, focus_zoom);
        let map = MapView::new(Camera { center, zoom });

        let mut location_tracker = LocationTracker::new();
        location_tracker.mount(runtime.handle(), &location_provider, &cc.egui_ctx);
        let mut center_tracker = CenterTracker::new();
        center_tracker.mount();

        Ok(Self {
            state,
            map,
            tiles,
            runtime,
            location_provider,
            locator: Locator::default(),
            location_tracker,
            center_tracker,
            add_form: None,
            scroll_to_selected: false,
            window_pos: None,
            window_size: None,
            needs_center: false,
            data_dir,
            settings,
        })
    }

    /// Feed one action through the reducer
    pub fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        self.state = state.reduce(action);
    }

    // ========================================================================
    // HANDLERS
    // ========================================================================

    /// Start a single location lookup; ignored while one is in flight
    pub fn find_my_location(&mut self, ctx: &egui::Context) {
        if self.locator.start(self.runtime.handle(), &self.location_provider, ctx) {
            debug!("Find My Location requested");
        }
    }

    /// Open the add form at the current map center
    pub fn add_infrastructure(&mut self) {
        if self.add_form.is_some() {
            return;
        }
        self.add_form = Some(AddPointForm {
            at: self.state.center,
            draft: PointDraft::default(),
            focus_name: true,
        });
    }

    pub fn close_add_form(&mut self, outcome: FormOutcome) {
        if let Some(form) = self.add_form.take() {
            let added = matches!(outcome, FormOutcome::Submitted(_));
            self.dispatch(Action::AddFormClosed { at: form.at, outcome });
            if added {
                self.scroll_to_selected = true;
            }
        }
    }

    pub fn focus_on_infrastructure(&mut self, id: PointId) {
        self.dispatch(Action::Focus(id));
        self.scroll_to_selected = true;
    }

    /// Pick up finished location lookups from both the button and the tracker
    pub fn poll_location(&mut self, now: f64) {
        if let Some(result) = self.locator.poll() {
            match result {
                Ok(pos) => self.dispatch(Action::LocationResolved(pos)),
                Err(e) => self.dispatch(Action::LocationFailed(e)),
            }
        }

        if let Some(camera) = self.location_tracker.poll(self.map.zoom()) {
            self.move_map(camera, now);
        }
    }

    /// Hand a pending programmatic move from the state to the map widget
    pub fn apply_camera_request(&mut self, now: f64) {
        if let Some(camera) = self.state.take_camera_request() {
            self.move_map(camera, now);
        }
    }

    fn move_map(&mut self, camera: Camera, now: f64) {
        if let Some(event) = self.map.move_to(camera, now) {
            self.handle_map_events(&[event]);
        }
    }

    /// Route map events: marker clicks select, finished moves go through the center tracker
    pub fn handle_map_events(&mut self, events: &[MapEvent]) {
        for event in events {
            if let MapEvent::MarkerClicked(MarkerId::Point(id)) = event {
                self.dispatch(Action::Select(*id));
            }
        }
        for action in self.center_tracker.observe(events) {
            self.dispatch(action);
        }
    }

    /// Markers for the current state, in drawing order
    pub fn map_markers(&self) -> Vec<MapMarker> {
        let mut markers: Vec<MapMarker> = self
            .state
            .points
            .iter()
            .map(|p| MapMarker {
                id: MarkerId::Point(p.id),
                position: p.position,
                style: MarkerStyle::Pin,
                color: theme::category_colors(&p.category).1,
                selected: self.state.is_selected(p.id),
            })
            .collect();
        if let Some(position) = self.state.user_location {
            markers.push(MapMarker {
                id: MarkerId::UserLocation,
                position,
                style: MarkerStyle::Dot,
                color: theme::USER_LOCATION,
                selected: false,
            });
        }
        markers.extend(self.location_tracker.marker());
        markers
    }

    pub fn save_settings(&self) {
        let mut settings = self.settings.clone();
        settings.window_x = self.window_pos.map(|p| p.x);
        settings.window_y = self.window_pos.map(|p| p.y);
        settings.window_w = self.window_size.map(|s| s.x);
        settings.window_h = self.window_size.map(|s| s.y);
        settings.save(&self.data_dir);
    }

    pub fn shutdown(&mut self) {
        self.center_tracker.unmount();
        self.tiles.shutdown();
    }
}
