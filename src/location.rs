//! Device location providers
//!
//! A desktop process has no browser geolocation, so the position comes from a
//! [`LocationProvider`] chosen by the `geolocation` settings: a network
//! IP-geolocation lookup, a fixed configured position, or nothing at all.

use crate::settings::{GeolocationMode, GeolocationSettings};
use crate::types::Position;
use eframe::egui;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocateError {
    #[error("geolocation is not available")]
    Unsupported,
    #[error("request failed: {0}")]
    Http(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

pub type LocateFuture = Pin<Box<dyn Future<Output = Result<Position, LocateError>> + Send>>;

pub trait LocationProvider: Send + Sync {
    /// Resolve the current position once
    fn locate(&self) -> LocateFuture;
}

/// Looks the position up from a JSON IP-geolocation endpoint
pub struct NetworkLocationProvider {
    client: reqwest::Client,
    endpoint: String,
}

/// Body of an ipapi.co style response; other services share the field names
#[derive(Deserialize)]
struct GeoResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(alias = "lat")]
    latitude: Option<f64>,
    #[serde(alias = "lon")]
    longitude: Option<f64>,
}

impl NetworkLocationProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(crate::constants::USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

fn parse_response(body: &str) -> Result<Position, LocateError> {
    let resp: GeoResponse =
        serde_json::from_str(body).map_err(|e| LocateError::Malformed(e.to_string()))?;
    if resp.error {
        return Err(LocateError::Unavailable(
            resp.reason.unwrap_or_else(|| "unknown reason".into()),
        ));
    }
    match (resp.latitude, resp.longitude) {
        (Some(lat), Some(lon)) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) => {
            Ok(Position::new(lat, lon))
        }
        (Some(_), Some(_)) => Err(LocateError::Malformed("coordinates out of range".into())),
        _ => Err(LocateError::Malformed("missing coordinates".into())),
    }
}

impl LocationProvider for NetworkLocationProvider {
    fn locate(&self) -> LocateFuture {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        Box::pin(async move {
            debug!(url = %endpoint, "Requesting network location");
            let response = client
                .get(&endpoint)
                .send()
                .await
                .map_err(|e| LocateError::Http(e.to_string()))?;
            if !response.status().is_success() {
                return Err(LocateError::Status(response.status().as_u16()));
            }
            let body = response
                .text()
                .await
                .map_err(|e| LocateError::Http(e.to_string()))?;
            parse_response(&body)
        })
    }
}

/// Always resolves to the same position
pub struct FixedLocationProvider(pub Position);

impl LocationProvider for FixedLocationProvider {
    fn locate(&self) -> LocateFuture {
        let pos = self.0;
        Box::pin(async move { Ok(pos) })
    }
}

/// Geolocation switched off
pub struct DisabledLocationProvider;

impl LocationProvider for DisabledLocationProvider {
    fn locate(&self) -> LocateFuture {
        Box::pin(async { Err(LocateError::Unsupported) })
    }
}

/// Build the provider described by the settings
pub fn provider_from_settings(
    settings: &GeolocationSettings,
) -> Result<Arc<dyn LocationProvider>, reqwest::Error> {
    Ok(match settings.mode {
        GeolocationMode::Network => Arc::new(NetworkLocationProvider::new(
            settings.endpoint.clone(),
            Duration::from_secs(settings.timeout_secs),
        )?),
        GeolocationMode::Fixed => Arc::new(FixedLocationProvider(Position::new(
            settings.fixed_lat,
            settings.fixed_lon,
        ))),
        GeolocationMode::Disabled => Arc::new(DisabledLocationProvider),
    })
}

/// A single in-flight location lookup, polled from the UI thread
pub struct LocationRequest {
    rx: oneshot::Receiver<Result<Position, LocateError>>,
}

impl LocationRequest {
    pub fn spawn(
        runtime: &tokio::runtime::Handle,
        provider: &Arc<dyn LocationProvider>,
        ctx: &egui::Context,
    ) -> Self {
        let (tx, rx) = oneshot::channel();
        let fut = provider.locate();
        let ctx = ctx.clone();
        runtime.spawn(async move {
            let result = fut.await;
            if tx.send(result).is_err() {
                debug!("Location request dropped before delivery");
            }
            ctx.request_repaint();
        });
        Self { rx }
    }

    /// Returns the result once it has arrived
    pub fn poll(&mut self) -> Option<Result<Position, LocateError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                warn!("Location task ended without a result");
                Some(Err(LocateError::Unavailable("lookup aborted".into())))
            }
        }
    }
}

/// Runs at most one lookup at a time; starts while one is pending are ignored
#[derive(Default)]
pub struct Locator {
    pending: Option<LocationRequest>,
}

impl Locator {
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a lookup. Returns `false` when one is already in flight.
    pub fn start(
        &mut self,
        runtime: &tokio::runtime::Handle,
        provider: &Arc<dyn LocationProvider>,
        ctx: &egui::Context,
    ) -> bool {
        if self.pending.is_some() {
            debug!("Location lookup already pending");
            return false;
        }
        self.pending = Some(LocationRequest::spawn(runtime, provider, ctx));
        true
    }

    /// The finished lookup's result; afterwards a new one may start
    pub fn poll(&mut self) -> Option<Result<Position, LocateError>> {
        let result = self.pending.as_mut()?.poll()?;
        self.pending = None;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn test_parse_ipapi_response() {
        let body = r#"{"ip":"1.2.3.4","city":"London","latitude":51.5072,"longitude":-0.1276}"#;
        assert_eq!(parse_response(body), Ok(Position::new(51.5072, -0.1276)));
    }

    #[test]
    fn test_parse_lat_lon_aliases() {
        let body = r#"{"status":"success","lat":10.0,"lon":20.0}"#;
        assert_eq!(parse_response(body), Ok(Position::new(10.0, 20.0)));
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"error":true,"reason":"RateLimited"}"#;
        assert_eq!(
            parse_response(body),
            Err(LocateError::Unavailable("RateLimited".into()))
        );
    }

    #[test]
    fn test_parse_missing_or_bad_coordinates() {
        assert!(matches!(parse_response(r#"{"city":"x"}"#), Err(LocateError::Malformed(_))));
        assert!(matches!(
            parse_response(r#"{"latitude":123.0,"longitude":0.0}"#),
            Err(LocateError::Malformed(_))
        ));
        assert!(matches!(parse_response("not json"), Err(LocateError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_fixed_and_disabled_providers() {
        let fixed = FixedLocationProvider(Position::new(10.0, 20.0));
        assert_eq!(fixed.locate().await, Ok(Position::new(10.0, 20.0)));
        assert_eq!(DisabledLocationProvider.locate().await, Err(LocateError::Unsupported));
    }

    #[test]
    fn test_request_delivers_result() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let provider: Arc<dyn LocationProvider> = Arc::new(FixedLocationProvider(Position::new(1.0, 2.0)));
        let ctx = egui::Context::default();
        let mut request = LocationRequest::spawn(runtime.handle(), &provider, &ctx);

        let mut result = None;
        for _ in 0..100 {
            result = request.poll();
            if result.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(result, Some(Ok(Position::new(1.0, 2.0))));
    }

    #[test]
    fn test_locator_ignores_start_while_pending() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let provider: Arc<dyn LocationProvider> = Arc::new(HangingProvider(calls.clone()));
        let ctx = egui::Context::default();
        let mut locator = Locator::default();

        assert!(locator.start(runtime.handle(), &provider, &ctx));
        assert!(!locator.start(runtime.handle(), &provider, &ctx));
        assert!(locator.is_pending());
        assert_eq!(locator.poll(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_locator_accepts_new_start_after_result() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let provider: Arc<dyn LocationProvider> = Arc::new(DisabledLocationProvider);
        let ctx = egui::Context::default();
        let mut locator = Locator::default();

        assert!(locator.start(runtime.handle(), &provider, &ctx));
        let mut result = None;
        for _ in 0..100 {
            result = locator.poll();
            if result.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(result, Some(Err(LocateError::Unsupported)));
        assert!(!locator.is_pending());
        assert!(locator.start(runtime.handle(), &provider, &ctx));
    }
}
