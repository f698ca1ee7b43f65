//! Common types and data structures

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Geographic position in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<(f64, f64)> for Position {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// Session-unique identifier of a point of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub u32);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, categorized, located infrastructure record
#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    pub id: PointId,
    pub name: String,
    pub category: String,
    pub position: Position,
    pub description: String,
}

/// Built-in sample infrastructure shown on startup
pub fn sample_infrastructure() -> Vec<PointOfInterest> {
    let samples = [
        (
            "Central Hospital",
            "Healthcare",
            (51.505, -0.09),
            "Main city hospital with emergency services",
        ),
        (
            "City Power Plant",
            "Energy",
            (51.51, -0.1),
            "Main power generation facility",
        ),
        (
            "Water Treatment Facility",
            "Utility",
            (51.515, -0.09),
            "Clean water processing plant",
        ),
        (
            "Main Train Station",
            "Transportation",
            (51.52, -0.095),
            "Central railway hub",
        ),
    ];

    samples
        .into_iter()
        .zip(1..)
        .map(|((name, category, pos, description), id)| PointOfInterest {
            id: PointId(id),
            name: name.to_string(),
            category: category.to_string(),
            position: pos.into(),
            description: description.to_string(),
        })
        .collect()
}

/// Field values typed into the add-infrastructure form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointDraft {
    pub name: String,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("name is required")]
    MissingName,
    #[error("category is required")]
    MissingCategory,
    #[error("description is required")]
    MissingDescription,
}

/// A draft whose fields are all present, trimmed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDraft {
    pub name: String,
    pub category: String,
    pub description: String,
}

impl PointDraft {
    pub fn validate(&self) -> Result<ValidDraft, DraftError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DraftError::MissingName);
        }
        let category = self.category.trim();
        if category.is_empty() {
            return Err(DraftError::MissingCategory);
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(DraftError::MissingDescription);
        }
        Ok(ValidDraft {
            name: name.to_string(),
            category: category.to_string(),
            description: description.to_string(),
        })
    }
}

/// How the add-infrastructure form was closed
#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    Submitted(PointDraft),
    Cancelled,
}

/// Target view for the map widget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub center: Position,
    pub zoom: u8,
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

    #[test]
    fn test_sample_ids_are_sequential() {
        let samples = sample_infrastructure();
        let ids: Vec<u32> = samples.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(samples[1].name, "City Power Plant");
        assert_eq!(samples[1].position, Position::new(51.51, -0.1));
    }

    #[test]
    fn test_validate_trims_fields() {
        let valid = draft("  Depot ", "Transportation", " Bus depot ").validate().unwrap();
        assert_eq!(valid.name, "Depot");
        assert_eq!(valid.description, "Bus depot");
    }

    #[test]
    fn test_validate_reports_first_missing_field() {
        assert_eq!(draft("", "Energy", "x").validate(), Err(DraftError::MissingName));
        assert_eq!(draft("a", "  ", "x").validate(), Err(DraftError::MissingCategory));
        assert_eq!(draft("a", "Energy", "").validate(), Err(DraftError::MissingDescription));
    }

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(51.505, -0.09).to_string(), "51.50500, -0.09000");
    }
}
