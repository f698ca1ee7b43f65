//! User settings stored as settings.json in the app data directory

use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Window geometry
    pub window_x: Option<f32>,
    pub window_y: Option<f32>,
    pub window_w: Option<f32>,
    pub window_h: Option<f32>,

    pub map: MapSettings,
    pub geolocation: GeolocationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub tile_url: String,
    pub attribution: String,
    pub attribution_url: String,
    pub default_lat: f64,
    pub default_lon: f64,
    pub default_zoom: u8,
    pub focus_zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeolocationMode {
    Network,
    Fixed,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationSettings {
    pub mode: GeolocationMode,
    pub endpoint: String,
    pub fixed_lat: f64,
    pub fixed_lon: f64,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_x: None,
            window_y: None,
            window_w: None,
            window_h: None,
            map: MapSettings::default(),
            geolocation: GeolocationSettings::default(),
        }
    }
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            tile_url: TILE_URL.to_string(),
            attribution: TILE_ATTRIBUTION.to_string(),
            attribution_url: TILE_ATTRIBUTION_URL.to_string(),
            default_lat: DEFAULT_CENTER.0,
            default_lon: DEFAULT_CENTER.1,
            default_zoom: DEFAULT_ZOOM,
            focus_zoom: FOCUS_ZOOM,
        }
    }
}

impl Default for GeolocationSettings {
    fn default() -> Self {
        Self {
            mode: GeolocationMode::Network,
            endpoint: GEOLOCATION_URL.to_string(),
            fixed_lat: DEFAULT_CENTER.0,
            fixed_lon: DEFAULT_CENTER.1,
            timeout_secs: GEOLOCATION_TIMEOUT_SECS,
        }
    }
}

impl MapSettings {
    /// Zoom levels clamped to what the tile source serves
    pub fn zooms(&self) -> (u8, u8) {
        (
            self.default_zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            self.focus_zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        )
    }
}

impl Settings {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("settings.json");
        match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(settings) => {
                    debug!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) {
        let path = data_dir.join("settings.json");
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(error = %e, "Failed to save settings");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize settings"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings.map.default_zoom, DEFAULT_ZOOM);
        assert_eq!(settings.map.tile_url, TILE_URL);
        assert_eq!(settings.geolocation.mode, GeolocationMode::Network);
        assert!(settings.window_w.is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.window_w = Some(1200.0);
        settings.geolocation.mode = GeolocationMode::Fixed;
        settings.geolocation.fixed_lat = 10.0;
        settings.save(dir.path());

        let loaded = Settings::load(dir.path());
        assert_eq!(loaded.window_w, Some(1200.0));
        assert_eq!(loaded.geolocation.mode, GeolocationMode::Fixed);
        assert_eq!(loaded.geolocation.fixed_lat, 10.0);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"geolocation":{"mode":"disabled"},"map":{"focus_zoom":40}}"#,
        )
        .unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings.geolocation.mode, GeolocationMode::Disabled);
        assert_eq!(settings.geolocation.endpoint, GEOLOCATION_URL);
        assert_eq!(settings.map.zooms(), (DEFAULT_ZOOM, MAX_ZOOM));
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
        let settings = Settings::load(dir.path());
        assert_eq!(settings.map.focus_zoom, FOCUS_ZOOM);
    }
}
