//! Configuration management for the lifetrack converter
//!
//! Handles loading configuration from files and environment variables
//! and validates every setting before a run starts.

use crate::geometry::{BoundingRegion, Point};
use crate::TrackError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Input and output directories
    #[serde(default)]
    pub paths: PathsConfig,
    /// Routing provider credentials and HTTP settings
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Coordinate inference settings
    #[serde(default)]
    pub inference: InferenceConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where diaries are read from and tracks written to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding unprocessed diary files
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,
    /// Directory receiving GPX files and processed diaries
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

/// Routing provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Google Maps Directions API key
    #[serde(default)]
    pub google_maps_api_key: Option<String>,
    /// TomTom Routing API key
    #[serde(default)]
    pub tom_tom_api_key: Option<String>,
    /// Use Google when both keys are set (TomTom otherwise)
    #[serde(default)]
    pub prefer_google: bool,
    /// Request timeout in seconds
    #[serde(default = "default_routing_timeout")]
    pub timeout_seconds: u32,
}

/// Settings for the bounds engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Region in which places without explicit coordinates are placed
    #[serde(default)]
    pub bounds: BoundsConfig,
    /// Maximum average travel speed in km/h
    #[serde(default = "default_avg_speed")]
    pub avg_speed: f64,
    /// Number of constraint propagation passes
    #[serde(default = "default_bounds_iterations")]
    pub bounds_iterations: u32,
    /// Radius of the initial region around explicit coordinates
    #[serde(default = "default_known_location_radius")]
    pub known_location_radius_km: f64,
}

/// Two opposite corners of the default region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundsConfig {
    #[serde(default = "default_bounds_point1")]
    pub point1: Point,
    #[serde(default = "default_bounds_point2")]
    pub point2: Point,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_input_path() -> PathBuf {
    PathBuf::from("diaries")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("tracks")
}

fn default_routing_timeout() -> u32 {
    30
}

fn default_avg_speed() -> f64 {
    10.0
}

fn default_bounds_iterations() -> u32 {
    100
}

fn default_known_location_radius() -> f64 {
    0.1
}

fn default_bounds_point1() -> Point {
    Point::new(39.038_058, -9.377_571)
}

fn default_bounds_point2() -> Point {
    Point::new(38.713_286, -9.125_020)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_path: default_output_path(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            google_maps_api_key: None,
            tom_tom_api_key: None,
            prefer_google: false,
            timeout_seconds: default_routing_timeout(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            bounds: BoundsConfig::default(),
            avg_speed: default_avg_speed(),
            bounds_iterations: default_bounds_iterations(),
            known_location_radius_km: default_known_location_radius(),
        }
    }
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            point1: default_bounds_point1(),
            point2: default_bounds_point2(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl RoutingConfig {
    /// Google key, if set to something non-empty
    #[must_use]
    pub fn google_key(&self) -> Option<&str> {
        self.google_maps_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// TomTom key, if set to something non-empty
    #[must_use]
    pub fn tom_tom_key(&self) -> Option<&str> {
        self.tom_tom_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl BoundsConfig {
    #[must_use]
    pub fn region(&self) -> BoundingRegion {
        BoundingRegion::new(self.point1, self.point2)
    }
}

impl TrackConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        // Format follows the extension, so both TOML and JSON files work
        if config_file.exists() {
            builder = builder.add_source(File::from(config_file.clone()).required(false));
        }

        // Environment overrides, e.g. LIFETRACK_ROUTING__TOM_TOM_API_KEY
        builder = builder.add_source(
            Environment::with_prefix("LIFETRACK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TrackConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("lifetrack").join("config.toml"))
    }

    /// Apply default values to zeroed or empty fields
    pub fn apply_defaults(&mut self) {
        if self.paths.input_path.as_os_str().is_empty() {
            self.paths.input_path = default_input_path();
        }
        if self.paths.output_path.as_os_str().is_empty() {
            self.paths.output_path = default_output_path();
        }
        if self.routing.timeout_seconds == 0 {
            self.routing.timeout_seconds = default_routing_timeout();
        }
        if self.inference.bounds_iterations == 0 {
            self.inference.bounds_iterations = default_bounds_iterations();
        }
        if self.inference.known_location_radius_km == 0.0 {
            self.inference.known_location_radius_km = default_known_location_radius();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_inference()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// At least one routing provider must be usable
    pub fn validate_api_keys(&self) -> Result<()> {
        if self.routing.google_key().is_none() && self.routing.tom_tom_key().is_none() {
            return Err(TrackError::config(
                "No API set to generate routes. Please set a Google Maps or TomTom API key",
            )
            .into());
        }

        Ok(())
    }

    fn validate_inference(&self) -> Result<()> {
        let inference = &self.inference;

        inference.bounds.point1.validate()?;
        inference.bounds.point2.validate()?;

        if !inference.avg_speed.is_finite() || inference.avg_speed <= 0.0 {
            return Err(TrackError::config("Average speed must be a positive number").into());
        }

        if !inference.known_location_radius_km.is_finite()
            || inference.known_location_radius_km < 0.0
        {
            return Err(
                TrackError::config("Known location radius cannot be negative").into(),
            );
        }

        if inference.bounds_iterations > 100_000 {
            return Err(TrackError::config("Bounds iterations cannot exceed 100000").into());
        }

        if self.routing.timeout_seconds > 300 {
            return Err(
                TrackError::config("Routing API timeout cannot exceed 300 seconds").into(),
            );
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TrackError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TrackError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        Ok(())
    }
}
