//! TomTom Routing API backend

use serde::Deserialize;

use super::{RawRoute, RouteApi};
use crate::geometry::Point;
use crate::{Result, TrackError};

pub const ROUTING_URL: &str = "https://api.tomtom.com/routing/1/calculateRoute";

/// Request building and parsing for the TomTom Routing API
#[derive(Debug, Clone)]
pub struct TomTomRouting {
    api_key: String,
    base_url: String,
}

impl TomTomRouting {
    #[must_use]
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: ROUTING_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalculateRouteResponse {
    #[serde(default)]
    routes: Vec<TomTomRoute>,
    #[serde(default)]
    error: Option<ErrorDescription>,
    #[serde(default)]
    detailed_error: Option<DetailedError>,
}

#[derive(Debug, Deserialize)]
struct TomTomRoute {
    summary: Summary,
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    length_in_meters: f64,
    travel_time_in_seconds: f64,
}

#[derive(Debug, Deserialize)]
struct Leg {
    #[serde(default)]
    points: Vec<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorDescription {
    description: String,
}

#[derive(Debug, Deserialize)]
struct DetailedError {
    code: String,
    #[serde(default)]
    message: String,
}

impl RouteApi for TomTomRouting {
    fn name(&self) -> &'static str {
        "TomTom Routing"
    }

    fn request_url(&self, origin: &str, destination: &str) -> String {
        format!(
            "{}/{}:{}/json?routeRepresentation=polyline&key={}",
            self.base_url,
            origin,
            destination,
            urlencoding::encode(&self.api_key)
        )
    }

    fn parse(&self, body: &str) -> Result<RawRoute> {
        let response: CalculateRouteResponse = serde_json::from_str(body)
            .map_err(|e| TrackError::parse(format!("Failed to parse TomTom response: {e}")))?;

        if let Some(detailed) = response.detailed_error {
            return Err(TrackError::api(format!(
                "TomTom error {}: {}",
                detailed.code, detailed.message
            )));
        }
        if let Some(error) = response.error {
            return Err(TrackError::api(format!("TomTom error: {}", error.description)));
        }

        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| TrackError::parse("No routes in TomTom response"))?;

        let points: Vec<Point> = route
            .legs
            .iter()
            .flat_map(|leg| leg.points.iter())
            .map(|p| Point::new(p.latitude, p.longitude))
            .collect();
        if points.is_empty() {
            return Err(TrackError::parse("TomTom route has no points"));
        }

        Ok(RawRoute {
            points,
            distance_m: route.summary.length_in_meters,
            duration_s: route.summary.travel_time_in_seconds,
        })
    }
}
