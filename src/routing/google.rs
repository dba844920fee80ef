//! Google Maps Directions API backend

use serde::Deserialize;

use super::polyline::{self, DEFAULT_PRECISION};
use super::{RawRoute, RouteApi};
use crate::{Result, TrackError};

pub const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Request building and parsing for the Directions API
#[derive(Debug, Clone)]
pub struct GoogleDirections {
    api_key: String,
    base_url: String,
}

impl GoogleDirections {
    #[must_use]
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: DIRECTIONS_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    overview_polyline: OverviewPolyline,
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    distance: TextValue,
    duration: TextValue,
}

/// `{"text": "12.3 km", "value": 12345}`
#[derive(Debug, Deserialize)]
struct TextValue {
    value: f64,
}

impl RouteApi for GoogleDirections {
    fn name(&self) -> &'static str {
        "Google Directions"
    }

    fn request_url(&self, origin: &str, destination: &str) -> String {
        format!(
            "{}?origin={}&destination={}&key={}",
            self.base_url,
            urlencoding::encode(origin),
            urlencoding::encode(destination),
            urlencoding::encode(&self.api_key)
        )
    }

    fn parse(&self, body: &str) -> Result<RawRoute> {
        let response: DirectionsResponse = serde_json::from_str(body)
            .map_err(|e| TrackError::parse(format!("Failed to parse Directions response: {e}")))?;

        if response.status != "OK" {
            return Err(TrackError::api(format!(
                "Directions API status {}: {}",
                response.status,
                response.error_message.unwrap_or_default()
            )));
        }

        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| TrackError::parse("No routes in Directions response"))?;

        let points = polyline::decode(&route.overview_polyline.points, DEFAULT_PRECISION)?;
        if points.is_empty() {
            return Err(TrackError::parse("Directions route has no points"));
        }

        Ok(RawRoute {
            points,
            distance_m: route.legs.iter().map(|leg| leg.distance.value).sum(),
            duration_s: route.legs.iter().map(|leg| leg.duration.value).sum(),
        })
    }
}
