//! `lifetrack` - GPX tracks from place-based life diaries
//!
//! A diary records where its author was and when, by place name only. This
//! library infers plausible coordinates for every place from the travel times
//! between them, fetches road routes for each trip and writes one GPX track per
//! day.

pub mod bounds;
pub mod config;
pub mod constraints;
pub mod converter;
pub mod diary;
pub mod error;
pub mod geometry;
pub mod gpx;
pub mod logging;
pub mod routing;

// Re-export core types for public API
pub use bounds::{BoundsEngine, Location, LocationTable};
pub use config::TrackConfig;
pub use constraints::ConstraintGraph;
pub use converter::{FileReport, RunReport, TrackConverter};
pub use diary::{Day, Diary, DiaryLoader, JsonDiaryLoader, Place, Span};
pub use error::TrackError;
pub use geometry::{BoundingRegion, Point};
pub use routing::{Route, RouteProvider, RouteService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
