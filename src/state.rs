//! View state for the map viewer
//!
//! All mutations of the viewer go through [`ViewerState::reduce`], which consumes
//! the current state together with an [`Action`] and returns the next state.
//! Rendering reads the state; event handlers only ever produce actions.

use crate::constants::*;
use crate::location::LocateError;
use crate::types::*;
use tracing::{debug, info, warn};

/// Everything that can change the viewer state
#[derive(Debug, Clone)]
pub enum Action {
    /// "Find My Location" resolved
    LocationResolved(Position),
    /// "Find My Location" failed
    LocationFailed(LocateError),
    /// The add form was closed; `at` is the map center captured when it opened
    AddFormClosed { at: Position, outcome: FormOutcome },
    /// List entry clicked: select and fly to the point
    Focus(PointId),
    /// Marker clicked: select without moving the map
    Select(PointId),
    /// The map finished a pan, zoom or flight
    MoveEnded { center: Position, zoom: u8 },
    DismissAlert,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    pub points: Vec<PointOfInterest>,
    pub user_location: Option<Position>,
    pub selected: Option<PointId>,
    pub center: Position,
    pub zoom: u8,
    pub focus_zoom: u8,
    pub alert: Option<String>,
    /// Programmatic camera move the map widget has not yet applied
    pub camera_request: Option<Camera>,
    next_id: u32,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new(
            sample_infrastructure(),
            DEFAULT_CENTER.into(),
            DEFAULT_ZOOM,
            FOCUS_ZOOM,
        )
    }
}

impl ViewerState {
    pub fn new(points: Vec<PointOfInterest>, center: Position, zoom: u8, focus_zoom: u8) -> Self {
        let next_id = points.iter().map(|p| p.id.0).max().unwrap_or(0) + 1;
        Self {
            points,
            user_location: None,
            selected: None,
            center,
            zoom,
            focus_zoom,
            alert: None,
            camera_request: None,
            next_id,
        }
    }

    pub fn reduce(mut self, action: Action) -> Self {
        match action {
            Action::LocationResolved(pos) => {
                info!(lat = pos.lat, lon = pos.lon, "Location found");
                self.user_location = Some(pos);
                self.center = pos;
                self.camera_request = Some(Camera {
                    center: pos,
                    zoom: self.zoom,
                });
            }
            Action::LocationFailed(err) => {
                warn!(error = %err, "Location lookup failed");
                let message = match err {
                    LocateError::Unsupported => ALERT_LOCATION_UNSUPPORTED,
                    _ => ALERT_LOCATION_FAILED,
                };
                self.alert = Some(message.to_string());
            }
            Action::AddFormClosed { at, outcome } => {
                let FormOutcome::Submitted(draft) = outcome else {
                    debug!("Add infrastructure cancelled");
                    return self;
                };
                match draft.validate() {
                    Ok(valid) => {
                        let id = PointId(self.next_id);
                        self.next_id += 1;
                        info!(%id, name = %valid.name, category = %valid.category, "Infrastructure added");
                        self.points.push(PointOfInterest {
                            id,
                            name: valid.name,
                            category: valid.category,
                            position: at,
                            description: valid.description,
                        });
                        self.selected = Some(id);
                    }
                    Err(e) => debug!(reason = %e, "Add infrastructure aborted"),
                }
            }
            Action::Focus(id) => {
                if let Some(pos) = self.point(id).map(|p| p.position) {
                    self.selected = Some(id);
                    self.center = pos;
                    self.zoom = self.focus_zoom;
                    self.camera_request = Some(Camera {
                        center: pos,
                        zoom: self.focus_zoom,
                    });
                }
            }
            Action::Select(id) => {
                if self.point(id).is_some() {
                    self.selected = Some(id);
                }
            }
            Action::MoveEnded { center, zoom } => {
                self.center = center;
                self.zoom = zoom;
            }
            Action::DismissAlert => self.alert = None,
        }
        self
    }

    pub fn point(&self, id: PointId) -> Option<&PointOfInterest> {
        self.points.iter().find(|p| p.id == id)
    }

    pub fn selected_point(&self) -> Option<&PointOfInterest> {
        self.selected.and_then(|id| self.point(id))
    }

    pub fn is_selected(&self, id: PointId) -> bool {
        self.selected == Some(id)
    }

    /// Take the pending programmatic camera move, if any
    pub fn take_camera_request(&mut self) -> Option<Camera> {
        self.camera_request.take()
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for p in &self.points {
            if !seen.contains(&p.category.as_str()) {
                seen.push(&p.category);
            }
        }
        seen
    }

    /// Neighbour of the selected point in list order, for keyboard navigation
    pub fn neighbour(&self, delta: i32) -> Option<PointId> {
        if self.points.is_empty() {
            return None;
        }
        let last = self.points.len() as i32 - 1;
        let target = match self.selected.and_then(|id| self.points.iter().position(|p| p.id == id)) {
            Some(pos) => (pos as i32 + delta).clamp(0, last),
            None if delta < 0 => last,
            None => 0,
        };
        Some(self.points[target as usize].id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, category: &str, description: &str) -> PointDraft {
        PointDraft {
            name: name.into(),
            category: category.into(),
            description: description.into(),
        }
    }

    fn submit(state: ViewerState, d: PointDraft) -> ViewerState {
        let at = state.center;
        state.reduce(Action::AddFormClosed {
            at,
            outcome: FormOutcome::Submitted(d),
        })
    }

    #[test]
    fn test_default_state() {
        let state = ViewerState::default();
        assert_eq!(state.points.len(), 4);
        assert_eq!(state.center, Position::new(51.505, -0.09));
        assert_eq!(state.zoom, 13);
        assert!(state.user_location.is_none());
        assert!(state.selected.is_none());
    }

    #[test]
    fn test_add_appends_at_center_and_selects() {
        let state = ViewerState::default().reduce(Action::MoveEnded {
            center: Position::new(48.85, 2.35),
            zoom: 12,
        });
        let before = state.points.len();
        let state = submit(state, draft("Substation", "Energy", "Grid substation"));

        assert_eq!(state.points.len(), before + 1);
        let added = state.points.last().unwrap();
        assert_eq!(added.position, Position::new(48.85, 2.35));
        assert_eq!(added.name, "Substation");
        assert_eq!(state.selected, Some(added.id));
    }

    #[test]
    fn test_add_uses_center_captured_at_open() {
        let state = ViewerState::default();
        let at = state.center;
        let state = state
            .reduce(Action::MoveEnded {
                center: Position::new(1.0, 2.0),
                zoom: 13,
            })
            .reduce(Action::AddFormClosed {
                at,
                outcome: FormOutcome::Submitted(draft("Depot", "Transportation", "Bus depot")),
            });
        assert_eq!(state.points.last().unwrap().position, at);
    }

    #[test]
    fn test_add_cancelled_or_incomplete_keeps_count() {
        let state = ViewerState::default();
        let at = state.center;
        let count = state.points.len();

        let state = state.reduce(Action::AddFormClosed {
            at,
            outcome: FormOutcome::Cancelled,
        });
        assert_eq!(state.points.len(), count);

        for d in [
            draft("", "Energy", "x"),
            draft("Name", "", "x"),
            draft("Name", "Energy", "   "),
        ] {
            let next = submit(state.clone(), d);
            assert_eq!(next.points.len(), count);
            assert!(next.selected.is_none());
        }
    }

    #[test]
    fn test_ids_stay_unique() {
        let mut state = ViewerState::default();
        for i in 0..5 {
            state = submit(state, draft(&format!("P{i}"), "Utility", "d"));
        }
        let mut ids: Vec<PointId> = state.points.iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), state.points.len());
        assert_eq!(state.points.last().unwrap().id, PointId(9));
    }

    #[test]
    fn test_focus_sets_selection_center_and_zoom() {
        let state = ViewerState::default().reduce(Action::MoveEnded {
            center: Position::new(0.0, 0.0),
            zoom: 3,
        });
        let target = state.points[2].clone();
        let state = state.reduce(Action::Focus(target.id));

        assert_eq!(state.selected, Some(target.id));
        assert_eq!(state.center, target.position);
        assert_eq!(state.zoom, FOCUS_ZOOM);
        assert_eq!(
            state.camera_request,
            Some(Camera {
                center: target.position,
                zoom: FOCUS_ZOOM
            })
        );
    }

    #[test]
    fn test_focus_is_idempotent() {
        let id = PointId(2);
        let once = ViewerState::default().reduce(Action::Focus(id));
        let twice = once.clone().reduce(Action::Focus(id));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_focus_unknown_point_is_ignored() {
        let state = ViewerState::default();
        let next = state.clone().reduce(Action::Focus(PointId(99)));
        assert_eq!(state, next);
    }

    #[test]
    fn test_select_does_not_move_map() {
        let state = ViewerState::default();
        let center = state.center;
        let state = state.reduce(Action::Select(PointId(4)));
        assert_eq!(state.selected, Some(PointId(4)));
        assert_eq!(state.center, center);
        assert!(state.camera_request.is_none());
    }

    #[test]
    fn test_location_resolved_sets_user_location_and_center() {
        let pos = Position::new(40.7128, -74.006);
        let state = ViewerState::default().reduce(Action::LocationResolved(pos));
        assert_eq!(state.user_location, Some(pos));
        assert_eq!(state.center, pos);
        assert!(state.alert.is_none());
    }

    #[test]
    fn test_location_failed_raises_one_alert() {
        let state = ViewerState::default();
        let next = state
            .clone()
            .reduce(Action::LocationFailed(LocateError::Unavailable("timeout".into())));
        assert_eq!(next.user_location, state.user_location);
        assert_eq!(next.center, state.center);
        assert_eq!(next.alert.as_deref(), Some(ALERT_LOCATION_FAILED));

        let next = next.reduce(Action::DismissAlert);
        assert!(next.alert.is_none());
    }

    #[test]
    fn test_location_unsupported_alert() {
        let state = ViewerState::default().reduce(Action::LocationFailed(LocateError::Unsupported));
        assert_eq!(state.alert.as_deref(), Some(ALERT_LOCATION_UNSUPPORTED));
        assert!(state.user_location.is_none());
    }

    #[test]
    fn test_neighbour_navigation() {
        let state = ViewerState::default();
        assert_eq!(state.neighbour(1), Some(PointId(1)));
        assert_eq!(state.neighbour(-1), Some(PointId(4)));
        let state = state.reduce(Action::Select(PointId(4)));
        assert_eq!(state.neighbour(1), Some(PointId(4)));
        assert_eq!(state.neighbour(-1), Some(PointId(3)));
    }

    #[test]
    fn test_categories_in_first_seen_order() {
        let state = submit(ViewerState::default(), draft("Clinic", "Healthcare", "Walk-in"));
        assert_eq!(
            state.categories(),
            vec!["Healthcare", "Energy", "Utility", "Transportation"]
        );
    }
}
