//! Travel-time constraint graph
//!
//! Observed travel between adjacent diary spans bounds how far apart two places
//! can be: nobody covers more than `avg_speed * hours` kilometres on average.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::diary::{Day, Place};

/// A trip implied by two adjacent spans (or declared by a transit span)
#[derive(Debug, Clone, PartialEq)]
pub struct Connection<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Connection<'_> {
    /// Elapsed travel time in hours
    #[must_use]
    pub fn hours(&self) -> f64 {
        (self.end - self.start).num_milliseconds().abs() as f64 / 3_600_000.0
    }
}

/// Trips taken during `day`, in span order.
///
/// Pairs where the earlier span is a transit, either place is unknown, both name
/// the same place, or no time elapses are skipped.
pub fn connections(day: &Day) -> impl Iterator<Item = Connection<'_>> {
    day.spans.windows(2).filter_map(|pair| {
        let (prev, span) = (&pair[0], &pair[1]);

        // transit and unknown spans have no single name
        let prev_name = prev.name()?;

        let connection = match &span.place {
            Place::Transit { from, to } => Connection {
                origin: from.as_str(),
                destination: to.as_str(),
                start: span.start_utc(),
                end: span.end_utc(),
            },
            Place::Single(name) if name != prev_name => Connection {
                origin: prev_name,
                destination: name.as_str(),
                start: prev.end_utc(),
                end: span.start_utc(),
            },
            _ => return None,
        };

        if connection.origin == connection.destination || connection.start == connection.end {
            return None;
        }
        Some(connection)
    })
}

/// Accumulated travel observations between two places
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TravelConstraint {
    total_hours: f64,
    observations: u32,
}

impl TravelConstraint {
    fn record(&mut self, hours: f64) {
        self.total_hours += hours;
        self.observations += 1;
    }

    #[must_use]
    pub fn observations(&self) -> u32 {
        self.observations
    }

    /// Mean observed travel time in hours
    #[must_use]
    pub fn average_hours(&self) -> f64 {
        if self.observations == 0 {
            return 0.0;
        }
        self.total_hours / f64::from(self.observations)
    }

    /// Furthest apart (km) the two places can be at `avg_speed` km/h
    #[must_use]
    pub fn max_distance_km(&self, avg_speed: f64) -> f64 {
        avg_speed * self.average_hours()
    }
}

/// Symmetric graph of travel constraints between places
#[derive(Debug, Clone, Default)]
pub struct ConstraintGraph {
    avg_speed: f64,
    /// Neighbours in insertion order so propagation is reproducible
    edges: HashMap<String, Vec<(String, TravelConstraint)>>,
}

impl ConstraintGraph {
    /// Build the graph from every connection of every day
    #[must_use]
    pub fn build(days: &[Day], avg_speed: f64) -> Self {
        let mut graph = Self {
            avg_speed,
            edges: HashMap::new(),
        };

        for day in days {
            for connection in connections(day) {
                let hours = connection.hours();
                graph.record(connection.origin, connection.destination, hours);
                graph.record(connection.destination, connection.origin, hours);
            }
        }

        debug!(
            "Built constraint graph with {} places and {} edges",
            graph.edges.len(),
            graph.edge_count()
        );
        graph
    }

    fn record(&mut self, from: &str, to: &str, hours: f64) {
        let neighbours = self.edges.entry(from.to_string()).or_default();
        match neighbours.iter_mut().find(|(name, _)| name == to) {
            Some((_, constraint)) => constraint.record(hours),
            None => {
                let mut constraint = TravelConstraint::default();
                constraint.record(hours);
                neighbours.push((to.to_string(), constraint));
            }
        }
    }

    #[must_use]
    pub fn avg_speed(&self) -> f64 {
        self.avg_speed
    }

    /// Number of undirected edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum::<usize>() / 2
    }

    #[must_use]
    pub fn constraint(&self, a: &str, b: &str) -> Option<&TravelConstraint> {
        self.edges
            .get(a)?
            .iter()
            .find(|(name, _)| name == b)
            .map(|(_, constraint)| constraint)
    }

    /// Distance bound (km) between `a` and `b`, if they were ever connected
    #[must_use]
    pub fn max_distance_km(&self, a: &str, b: &str) -> Option<f64> {
        self.constraint(a, b)
            .map(|constraint| constraint.max_distance_km(self.avg_speed))
    }

    /// Neighbours of `name` with their distance bound in km
    pub fn neighbours<'a>(&'a self, name: &str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        let avg_speed = self.avg_speed;
        self.edges
            .get(name)
            .into_iter()
            .flatten()
            .map(move |(neighbour, constraint)| {
                (neighbour.as_str(), constraint.max_distance_km(avg_speed))
            })
    }
}
