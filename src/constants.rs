//! Application constants and configuration defaults

pub const APP_NAME: &str = "Infrastructure Map";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const USER_AGENT: &str = concat!("infra-map/", env!("CARGO_PKG_VERSION"));

// Tile source
pub const TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const TILE_ATTRIBUTION: &str = "© OpenStreetMap contributors";
pub const TILE_ATTRIBUTION_URL: &str = "https://www.openstreetmap.org/copyright";
pub const TILE_SUBDOMAINS: &[&str] = &["a", "b", "c"];
pub const TILE_SIZE: f64 = 256.0;
pub const TILE_CACHE_CAPACITY: usize = 400;
pub const TILE_FETCH_CONCURRENCY: usize = 6;

// Map view
pub const DEFAULT_CENTER: (f64, f64) = (51.505, -0.09); // London
pub const DEFAULT_ZOOM: u8 = 13;
pub const FOCUS_ZOOM: u8 = 15;
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 19;
pub const FLY_DURATION_SECS: f64 = 0.5;

// Geolocation
pub const GEOLOCATION_URL: &str = "https://ipapi.co/json/";
pub const GEOLOCATION_TIMEOUT_SECS: u64 = 10;

// Alerts
pub const ALERT_LOCATION_UNSUPPORTED: &str = "Geolocation is not supported on this system.";
pub const ALERT_LOCATION_FAILED: &str =
    "Unable to retrieve your location. Please check your network connection and location settings.";
