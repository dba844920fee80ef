//! Coordinate inference for diary places
//!
//! Every place starts with a candidate region: a small box around its explicit
//! coordinates, or the configured default region. Each pass picks a point for a
//! place and shrinks its neighbours' regions to what is reachable from there in
//! the observed travel time. Places with explicit coordinates go first so their
//! fixed points propagate before random sampling starts elsewhere.
//!
//! This is a randomised heuristic; different seeds can give different results.

use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, info, trace};

use crate::config::InferenceConfig;
use crate::constraints::ConstraintGraph;
use crate::diary::Diary;
use crate::geometry::{BoundingRegion, Point, bounding_region};
use crate::Result;

/// Inference state of one place
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    /// Coordinates declared in the diary, never overwritten
    pub explicit: Option<Point>,
    pub inferred: Option<Point>,
    pub candidate: BoundingRegion,
}

impl Location {
    /// Final coordinates: explicit if declared, inferred otherwise
    #[must_use]
    pub fn point(&self) -> Option<Point> {
        self.explicit.or(self.inferred)
    }
}

/// Location state shared by every inference step, in visiting order
#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    locations: Vec<Location>,
    index: HashMap<String, usize>,
}

impl LocationTable {
    fn push(&mut self, location: Location) {
        self.index.insert(location.name.clone(), self.locations.len());
        self.locations.push(location);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Location> {
        self.index.get(name).map(|&i| &self.locations[i])
    }

    /// Resolved coordinates of `name`
    #[must_use]
    pub fn point(&self, name: &str) -> Option<Point> {
        self.get(name).and_then(Location::point)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Locations in visiting order
    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    /// Give `name` the coordinates `point` unless it has explicit ones.
    ///
    /// Names that were never mentioned in the diary are added. Returns whether
    /// the table changed.
    fn assign(&mut self, name: &str, point: Point) -> bool {
        match self.index.get(name) {
            Some(&i) => {
                let location = &mut self.locations[i];
                if location.explicit.is_some() || location.inferred == Some(point) {
                    return false;
                }
                location.inferred = Some(point);
                true
            }
            None => {
                self.push(Location {
                    name: name.to_string(),
                    explicit: None,
                    inferred: Some(point),
                    candidate: BoundingRegion::new(point, point),
                });
                true
            }
        }
    }
}

/// Bounding-box constraint propagation
#[derive(Debug, Clone)]
pub struct BoundsEngine {
    iterations: u32,
    global_bounds: BoundingRegion,
    known_radius_km: f64,
}

impl BoundsEngine {
    #[must_use]
    pub fn new(iterations: u32, global_bounds: BoundingRegion, known_radius_km: f64) -> Self {
        Self {
            iterations,
            global_bounds,
            known_radius_km,
        }
    }

    #[must_use]
    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::new(
            config.bounds_iterations,
            config.bounds.region(),
            config.known_location_radius_km,
        )
    }

    /// Infer coordinates for every place in `diary` and resolve aliases
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        diary: &Diary,
        graph: &ConstraintGraph,
        rng: &mut R,
    ) -> Result<LocationTable> {
        let mut table = self.seed(diary)?;
        self.infer(&mut table, graph, rng)?;
        resolve_aliases(&mut table, diary);

        info!("Resolved coordinates for {} places", table.len());
        Ok(table)
    }

    /// Initial table: explicit-coordinate places first, each group in discovery order
    pub fn seed(&self, diary: &Diary) -> Result<LocationTable> {
        let (known, unknown): (Vec<&str>, Vec<&str>) = diary
            .all_places()
            .into_iter()
            .partition(|name| diary.coordinates.contains_key(*name));

        let mut table = LocationTable::default();
        for name in known {
            let point = diary.coordinates[name];
            table.push(Location {
                name: name.to_string(),
                explicit: Some(point),
                inferred: None,
                candidate: bounding_region(&point, self.known_radius_km)?,
            });
        }
        for name in unknown {
            table.push(Location {
                name: name.to_string(),
                explicit: None,
                inferred: None,
                candidate: self.global_bounds,
            });
        }

        Ok(table)
    }

    /// Run the configured number of propagation passes over `table`
    pub fn infer<R: Rng + ?Sized>(
        &self,
        table: &mut LocationTable,
        graph: &ConstraintGraph,
        rng: &mut R,
    ) -> Result<()> {
        for iteration in 0..self.iterations {
            trace!("Bounds iteration {}", iteration);
            for i in 0..table.locations.len() {
                self.step(table, i, graph, rng)?;
            }
        }

        debug!(
            "Finished {} bounds iterations over {} places",
            self.iterations,
            table.len()
        );
        Ok(())
    }

    fn step<R: Rng + ?Sized>(
        &self,
        table: &mut LocationTable,
        i: usize,
        graph: &ConstraintGraph,
        rng: &mut R,
    ) -> Result<()> {
        let location = &mut table.locations[i];
        let point = match (location.explicit, location.inferred) {
            (Some(explicit), _) => explicit,
            (None, Some(inferred)) if location.candidate.contains(&inferred) => inferred,
            (None, _) => location.candidate.random_point(rng),
        };
        location.inferred = Some(point);

        let origin = location.name.clone();
        for (neighbour, max_distance) in graph.neighbours(&origin) {
            let Some(&j) = table.index.get(neighbour) else {
                continue;
            };

            let reachable = bounding_region(&point, max_distance)?;
            let candidate = &mut table.locations[j].candidate;
            *candidate = match candidate.try_intersect(&reachable) {
                Some(narrowed) => narrowed,
                None => {
                    trace!(
                        "No overlap for {} around {}, resetting to reachable region",
                        neighbour, origin
                    );
                    reachable
                }
            };
        }

        Ok(())
    }
}

/// Copy resolved coordinates to subplaces and renamed places.
///
/// Superplaces and renames can feed each other, so both are applied until no
/// point changes.
pub fn resolve_aliases(table: &mut LocationTable, diary: &Diary) {
    let mut subplaces: Vec<&String> = diary.superplaces.keys().collect();
    subplaces.sort();
    let mut renames: Vec<(&String, &Vec<String>)> = diary.nameswaps.iter().collect();
    renames.sort();

    let max_passes = diary.superplaces.len() + diary.nameswaps.len() + 1;
    for pass in 0..max_passes {
        let mut changed = false;

        for subplace in &subplaces {
            if let Some(point) = superplace_point(table, diary, subplace) {
                changed |= table.assign(subplace, point);
            }
        }

        for (old_name, new_names) in &renames {
            let Some(point) = table.point(old_name) else {
                continue;
            };
            for new_name in new_names.iter() {
                changed |= table.assign(new_name, point);
            }
        }

        if !changed {
            trace!("Aliases settled after {} passes", pass + 1);
            return;
        }
    }

    debug!("Aliases still changing after {} passes", max_passes);
}

/// Point of the outermost resolved superplace of `name`.
///
/// Walking stops at the first superplace with explicit coordinates.
fn superplace_point(table: &LocationTable, diary: &Diary, name: &str) -> Option<Point> {
    // follow chains like Desk -> Office -> Campus; the hop limit stops cycles
    let mut current = name;
    let mut resolved = None;
    for _ in 0..diary.superplaces.len() {
        let Some(parent) = diary.superplaces.get(current) else {
            break;
        };
        if parent == name {
            break;
        }
        if let Some(location) = table.get(parent) {
            if location.explicit.is_some() {
                return location.explicit;
            }
            resolved = location.inferred.or(resolved);
        }
        current = parent;
    }
    resolved
}
