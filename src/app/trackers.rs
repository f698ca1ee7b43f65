//! Subordinate widgets living next to the map: the location tracker that
//! resolves the device position once on startup, and the center tracker that
//! mirrors finished map moves into the viewer state.

use crate::location::{LocateError, LocationProvider, LocationRequest};
use crate::map::{MapEvent, MapMarker, MarkerId, MarkerStyle};
use crate::state::Action;
use crate::theme;
use crate::types::{Camera, Position};
use chrono::{DateTime, Local};
use eframe::egui;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// LOCATION TRACKER
// ============================================================================

#[derive(Default)]
pub struct LocationTracker {
    request: Option<LocationRequest>,
    position: Option<Position>,
    located_at: Option<DateTime<Local>>,
    mounted: bool,
}

impl LocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the one-time location request. Mounting again is a no-op.
    pub fn mount(
        &mut self,
        runtime: &tokio::runtime::Handle,
        provider: &Arc<dyn LocationProvider>,
        ctx: &egui::Context,
    ) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        debug!("Location tracker requesting position");
        self.request = Some(LocationRequest::spawn(runtime, provider, ctx));
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn located_at(&self) -> Option<DateTime<Local>> {
        self.located_at
    }

    /// Check the pending request. Returns the fly-to command on first delivery.
    pub fn poll(&mut self, current_zoom: u8) -> Option<Camera> {
        let result = self.request.as_mut()?.poll()?;
        self.request = None;
        self.deliver(result, current_zoom)
    }

    /// Handle one location delivery. Only the first successful one moves the map.
    pub fn deliver(&mut self, result: Result<Position, LocateError>, current_zoom: u8) -> Option<Camera> {
        match result {
            Ok(pos) if self.position.is_none() => {
                info!(lat = pos.lat, lon = pos.lon, "Location tracker found position");
                self.position = Some(pos);
                self.located_at = Some(Local::now());
                Some(Camera {
                    center: pos,
                    zoom: current_zoom,
                })
            }
            Ok(_) => {
                debug!("Ignoring repeated location delivery");
                None
            }
            Err(e) => {
                warn!(error = %e, "Location tracker could not resolve position");
                None
            }
        }
    }

    /// "You are here" marker, once the position is known
    pub fn marker(&self) -> Option<MapMarker> {
        self.position.map(|position| MapMarker {
            id: MarkerId::Tracked,
            position,
            style: MarkerStyle::Dot,
            color: theme::TRACKED_LOCATION,
            selected: false,
        })
    }
}

// ============================================================================
// CENTER TRACKER
// ============================================================================

#[derive(Debug, Default)]
pub struct CenterTracker {
    subscribed: bool,
}

impl CenterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self) {
        self.subscribed = true;
    }

    pub fn unmount(&mut self) {
        if self.subscribed {
            debug!("Center tracker unsubscribed");
        }
        self.subscribed = false;
    }

    /// Turn every finished move into a state update
    pub fn observe(&self, events: &[MapEvent]) -> Vec<Action> {
        if !self.subscribed {
            return Vec::new();
        }
        events
            .iter()
            .filter_map(|ev| match *ev {
                MapEvent::MoveEnded { center, zoom } => Some(Action::MoveEnded { center, zoom }),
                MapEvent::MarkerClicked(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapView;
    use crate::state::ViewerState;
    use crate::location::LocateFuture;
    use crate::types::PointId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts lookups and never resolves them
    struct HangingProvider(Arc<AtomicUsize>);

    impl LocationProvider for HangingProvider {
        fn locate(&self) -> LocateFuture {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(std::future::pending::<Result<Position, LocateError>>())
        }
    }

    #[test]
    fn test_mount_requests_location_once() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let provider: Arc<dyn LocationProvider> = Arc::new(HangingProvider(calls.clone()));
        let ctx = egui::Context::default();

        let mut tracker = LocationTracker::new();
        tracker.mount(runtime.handle(), &provider, &ctx);
        tracker.mount(runtime.handle(), &provider, &ctx);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.poll(13), None);
        assert!(tracker.marker().is_none());
    }

    #[test]
    fn test_first_delivery_flies_at_current_zoom() {
        let mut tracker = LocationTracker::new();
        assert!(tracker.marker().is_none());

        let pos = Position::new(48.85, 2.35);
        let camera = tracker.deliver(Ok(pos), 11);
        assert_eq!(camera, Some(Camera { center: pos, zoom: 11 }));
        assert_eq!(tracker.position(), Some(pos));
        assert!(tracker.located_at().is_some());

        let marker = tracker.marker().unwrap();
        assert_eq!(marker.id, MarkerId::Tracked);
        assert_eq!(marker.position, pos);
    }

    #[test]
    fn test_later_deliveries_ignored() {
        let mut tracker = LocationTracker::new();
        let first = Position::new(1.0, 2.0);
        tracker.deliver(Ok(first), 13);
        assert_eq!(tracker.deliver(Ok(Position::new(3.0, 4.0)), 13), None);
        assert_eq!(tracker.position(), Some(first));
    }

    #[test]
    fn test_failure_leaves_tracker_empty() {
        let mut tracker = LocationTracker::new();
        assert_eq!(tracker.deliver(Err(LocateError::Unsupported), 13), None);
        assert!(tracker.position().is_none());
        assert!(tracker.marker().is_none());
    }

    #[test]
    fn test_pan_to_coordinates_updates_tracked_center() {
        let mut map = MapView::new(Camera {
            center: Position::new(51.505, -0.09),
            zoom: 13,
        });
        let mut tracker = CenterTracker::new();
        tracker.mount();

        let ev = map.jump_to(Camera {
            center: Position::new(10.0, 20.0),
            zoom: 13,
        });
        let state = tracker
            .observe(&[ev])
            .into_iter()
            .fold(ViewerState::default(), ViewerState::reduce);
        assert_eq!(state.center, Position::new(10.0, 20.0));
        assert_eq!(state.zoom, 13);
    }

    #[test]
    fn test_every_move_forwarded_without_filtering() {
        let mut tracker = CenterTracker::new();
        tracker.mount();
        let events = [
            MapEvent::MoveEnded { center: Position::new(1.0, 1.0), zoom: 5 },
            MapEvent::MarkerClicked(MarkerId::Point(PointId(1))),
            MapEvent::MoveEnded { center: Position::new(1.0, 1.0), zoom: 5 },
        ];
        assert_eq!(tracker.observe(&events).len(), 2);
    }

    #[test]
    fn test_unmounted_tracker_forwards_nothing() {
        let mut tracker = CenterTracker::new();
        let ev = MapEvent::MoveEnded { center: Position::new(1.0, 1.0), zoom: 5 };
        assert!(tracker.observe(&[ev]).is_empty());
        tracker.mount();
        assert_eq!(tracker.observe(&[ev]).len(), 1);
        tracker.unmount();
        assert!(tracker.observe(&[ev]).is_empty());
    }
}
