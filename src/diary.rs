//! Parsed diary records
//!
//! A diary is an ordered list of days, each an ordered list of spans naming where
//! the writer was (or which trip they were on) between two UTC instants. Turning
//! raw diary text into these records is the job of a [`DiaryLoader`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::geometry::Point;
use crate::{Result, TrackError};

/// Where a span took place
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawPlace", into = "RawPlace")]
pub enum Place {
    /// No place recorded for the span
    #[default]
    Unknown,
    /// A single named place
    Single(String),
    /// An explicit trip from one place to another
    Transit { from: String, to: String },
}

/// Wire form: `"Home"`, `["Home", "Work"]`, `""` or `null`
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPlace {
    Transit([String; 2]),
    Name(Option<String>),
}

impl From<RawPlace> for Place {
    fn from(raw: RawPlace) -> Self {
        match raw {
            RawPlace::Transit([from, to]) => Place::Transit {
                from: from.trim().to_string(),
                to: to.trim().to_string(),
            },
            RawPlace::Name(Some(name)) if !name.trim().is_empty() => {
                Place::Single(name.trim().to_string())
            }
            RawPlace::Name(_) => Place::Unknown,
        }
    }
}

impl From<Place> for RawPlace {
    fn from(place: Place) -> Self {
        match place {
            Place::Unknown => RawPlace::Name(None),
            Place::Single(name) => RawPlace::Name(Some(name)),
            Place::Transit { from, to } => RawPlace::Transit([from, to]),
        }
    }
}

impl Place {
    /// Every place name this entry references
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Place::Unknown => vec![],
            Place::Single(name) => vec![name.as_str()],
            Place::Transit { from, to } => vec![from.as_str(), to.as_str()],
        }
    }
}

/// A diary entry covering a time interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub place: Place,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Span {
    #[must_use]
    pub fn new(place: Place, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { place, start, end }
    }

    #[must_use]
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end
    }

    /// True when the span records a trip (`from`, `to`) rather than a stay
    #[must_use]
    pub fn is_transit(&self) -> bool {
        matches!(self.place, Place::Transit { .. })
    }

    /// The place name of a single-place span
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.place {
            Place::Single(name) => Some(name),
            _ => None,
        }
    }
}

/// One diary day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub date: NaiveDate,
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl Day {
    /// Distinct place names in order of first mention
    #[must_use]
    pub fn distinct_places(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.spans
            .iter()
            .flat_map(|span| span.place.names())
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

/// A fully parsed diary file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diary {
    #[serde(default)]
    pub days: Vec<Day>,
    /// Explicit coordinates declared in the diary header
    #[serde(default)]
    pub coordinates: HashMap<String, Point>,
    /// Subplace name to the superplace that contains it
    #[serde(default)]
    pub superplaces: HashMap<String, String>,
    /// Old place name to the names that replaced or share its location
    #[serde(default)]
    pub nameswaps: HashMap<String, Vec<String>>,
}

impl Diary {
    /// Distinct place names across all days in order of first mention
    #[must_use]
    pub fn all_places(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.days
            .iter()
            .flat_map(|day| day.spans.iter())
            .flat_map(|span| span.place.names())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Reject explicit coordinates that are out of range
    pub fn validate(&self) -> Result<()> {
        for (name, point) in &self.coordinates {
            point.validate().map_err(|e| {
                TrackError::validation(format!("explicit coordinates for '{name}': {e}"))
            })?;
        }
        Ok(())
    }
}

/// Source of parsed diaries
pub trait DiaryLoader: Send + Sync {
    /// Whether this loader understands the file at `path`
    fn accepts(&self, path: &Path) -> bool;

    fn load(&self, path: &Path) -> Result<Diary>;
}

/// Loads diaries that were already parsed into JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDiaryLoader;

impl DiaryLoader for JsonDiaryLoader {
    fn accepts(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }

    fn load(&self, path: &Path) -> Result<Diary> {
        info!("Loading diary from: {:?}", path);

        let content = fs::read_to_string(path)?;
        let diary: Diary = serde_json::from_str(&content).map_err(|e| {
            TrackError::parse(format!("failed to parse diary {}: {e}", path.display()))
        })?;
        diary.validate()?;

        debug!(
            "Loaded {} days with {} places",
            diary.days.len(),
            diary.all_places().len()
        );
        Ok(diary)
    }
}
