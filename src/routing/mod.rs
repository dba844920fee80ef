//! Route geometry from external routing providers
//!
//! Two interchangeable backends sit behind [`RouteProvider`]: the Google Maps
//! Directions API and the TomTom Routing API. Each backend only knows how to
//! build a request and parse a response ([`RouteApi`]); the HTTP round trip is
//! shared by [`HttpRouteProvider`]. One backend is picked per run from the
//! configured credentials.

pub mod google;
pub mod polyline;
pub mod service;
pub mod tomtom;

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::config::RoutingConfig;
use crate::geometry::Point;
use crate::{Result, TrackError};

pub use google::GoogleDirections;
pub use service::{Route, RouteService, TimedPoint, Waypoint};
pub use tomtom::TomTomRouting;

/// Geometry and totals of a route as reported by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct RawRoute {
    pub points: Vec<Point>,
    /// Total path length in metres
    pub distance_m: f64,
    /// Provider's travel time estimate in seconds
    pub duration_s: f64,
}

/// Anything that can produce a route between two coordinates
#[async_trait]
pub trait RouteProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, origin: &Point, destination: &Point) -> Result<RawRoute>;
}

/// Request construction and response parsing for one routing API
pub trait RouteApi: Send + Sync {
    fn name(&self) -> &'static str;

    /// Full request URL for two `lat,lng` strings
    fn request_url(&self, origin: &str, destination: &str) -> String;

    /// Parse a successful HTTP body; provider-level errors become `Err`
    fn parse(&self, body: &str) -> Result<RawRoute>;
}

/// [`RouteProvider`] that talks to a [`RouteApi`] over HTTP
pub struct HttpRouteProvider<A> {
    api: A,
    client: Client,
}

impl<A: RouteApi> HttpRouteProvider<A> {
    pub fn new(api: A, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lifetrack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { api, client })
    }
}

#[async_trait]
impl<A: RouteApi> RouteProvider for HttpRouteProvider<A> {
    fn name(&self) -> &'static str {
        self.api.name()
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, origin: &Point, destination: &Point) -> Result<RawRoute> {
        debug!("Calling the {} API", self.api.name());
        let url = self
            .api
            .request_url(&origin.to_query(), &destination.to_query());

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackError::api(format!(
                "{} returned HTTP {}",
                self.api.name(),
                status
            )));
        }

        let body = response.text().await?;
        self.api.parse(&body)
    }
}

/// Which routing API a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Google,
    TomTom,
}

/// Pick the backend and its key.
///
/// TomTom is preferred unless `prefer_google` is set; either falls back to the
/// other when its key is missing.
pub fn select_backend(config: &RoutingConfig) -> Result<(Backend, &str)> {
    match (config.prefer_google, config.google_key(), config.tom_tom_key()) {
        (true, Some(key), _) => Ok((Backend::Google, key)),
        (_, _, Some(key)) => Ok((Backend::TomTom, key)),
        (_, Some(key), None) => Ok((Backend::Google, key)),
        (_, None, None) => Err(TrackError::config(
            "No API set to generate routes. Please set a Google Maps or TomTom API key",
        )),
    }
}

/// Build the provider for this run
pub fn provider_from_config(config: &RoutingConfig) -> Result<Arc<dyn RouteProvider>> {
    let timeout = Duration::from_secs(config.timeout_seconds.into());

    let provider: Arc<dyn RouteProvider> = match select_backend(config)? {
        (Backend::Google, key) => {
            info!("Using Google Maps Directions API to generate routes");
            Arc::new(HttpRouteProvider::new(GoogleDirections::new(key), timeout)?)
        }
        (Backend::TomTom, key) => {
            info!("Using TomTom Routing API to generate routes");
            Arc::new(HttpRouteProvider::new(TomTomRouting::new(key), timeout)?)
        }
    };

    Ok(provider)
}
