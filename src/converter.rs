//! Diary directory to GPX conversion
//!
//! Each diary file in the input directory is converted on its own: load, build
//! the constraint graph, infer coordinates, fetch one route per connection and
//! write one GPX file per day. Finished diaries are moved into the output
//! directory, which also marks them as done for later runs.

use futures::future::join_all;
use rand::Rng;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::bounds::{BoundsEngine, LocationTable};
use crate::config::TrackConfig;
use crate::constraints::{ConstraintGraph, connections};
use crate::diary::{Day, DiaryLoader, JsonDiaryLoader};
use crate::gpx;
use crate::routing::{Route, RouteProvider, RouteService, Waypoint};
use crate::{Result, TrackError};

/// Outcome of converting one diary file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileReport {
    /// Where the diary ended up after conversion
    pub diary: PathBuf,
    pub tracks: Vec<PathBuf>,
    pub places: usize,
    pub segments: usize,
    /// Connections that produced no route
    pub missing_segments: usize,
}

/// Outcome of a whole run
#[derive(Debug, Default)]
pub struct RunReport {
    pub converted: Vec<FileReport>,
    /// Diaries already present in the output directory
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl RunReport {
    #[must_use]
    pub fn track_count(&self) -> usize {
        self.converted.iter().map(|report| report.tracks.len()).sum()
    }
}

pub struct TrackConverter {
    input_path: PathBuf,
    output_path: PathBuf,
    avg_speed: f64,
    engine: BoundsEngine,
    provider: Arc<dyn RouteProvider>,
    loader: Box<dyn DiaryLoader>,
}

impl TrackConverter {
    pub fn new(config: &TrackConfig, provider: Arc<dyn RouteProvider>) -> Self {
        Self {
            input_path: config.paths.input_path.clone(),
            output_path: config.paths.output_path.clone(),
            avg_speed: config.inference.avg_speed,
            engine: BoundsEngine::from_config(&config.inference),
            provider,
            loader: Box::new(JsonDiaryLoader),
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn DiaryLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Convert every diary in the input directory, in file name order.
    ///
    /// Fatal errors stop the run; any other failure is recorded and the next
    /// file is processed.
    pub async fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RunReport> {
        fs::create_dir_all(&self.output_path)?;

        let mut report = RunReport::default();
        for path in self.diary_files()? {
            if let Some(name) = path.file_name()
                && self.output_path.join(name).exists()
            {
                warn!(
                    "Skipping {}: already present in {}",
                    path.display(),
                    self.output_path.display()
                );
                report.skipped.push(path);
                continue;
            }

            match self.convert_file(&path, rng).await {
                Ok(file_report) => report.converted.push(file_report),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("Failed to convert {}: {}", path.display(), e);
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        info!(
            "Converted {} diaries into {} tracks ({} skipped, {} failed)",
            report.converted.len(),
            report.track_count(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn diary_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.input_path).map_err(|e| {
            TrackError::config(format!(
                "cannot read input directory {}: {e}",
                self.input_path.display()
            ))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if self.loader.accepts(&path) {
                files.push(path);
            } else {
                debug!("Ignoring {}", path.display());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Convert one diary file and move it into the output directory
    pub async fn convert_file<R: Rng + ?Sized>(&self, path: &Path, rng: &mut R) -> Result<FileReport> {
        info!("Converting {}", path.display());

        let diary = self.loader.load(path)?;
        let graph = ConstraintGraph::build(&diary.days, self.avg_speed);
        debug!("Built constraint graph with {} edges", graph.edge_count());

        let table = self.engine.resolve(&diary, &graph, rng)?;

        let service = RouteService::new(Arc::clone(&self.provider));
        let mut report = FileReport {
            places: table.len(),
            ..FileReport::default()
        };

        for day in diary.days.iter().filter(|day| gpx::should_emit(day)) {
            let routes = day_routes(&service, &table, day).await;
            let missing = routes.iter().filter(|route| route.is_empty()).count();

            report.segments += routes.len() - missing;
            report.missing_segments += missing;
            report
                .tracks
                .push(gpx::write_track_file(&self.output_path, day.date, &routes)?);

            info!(
                "Wrote track for {} with {} segments",
                day.date,
                routes.len() - missing
            );
        }

        debug!(
            "Fetched {} distinct routes from {}",
            service.cached_routes(),
            service.provider_name()
        );

        report.diary = self.relocate(path)?;
        Ok(report)
    }

    fn relocate(&self, path: &Path) -> Result<PathBuf> {
        let name = path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("not a file: {}", path.display()))
        })?;
        let target = self.output_path.join(name);

        if fs::rename(path, &target).is_err() {
            // rename fails across filesystems
            fs::copy(path, &target)?;
            fs::remove_file(path)?;
        }

        debug!("Moved {} to {}", path.display(), target.display());
        Ok(target)
    }
}

/// Routes for every connection of `day`, fetched concurrently and kept in span order
async fn day_routes(service: &RouteService, table: &LocationTable, day: &Day) -> Vec<Route> {
    let requests = connections(day).filter_map(|connection| {
        let origin = table.point(connection.origin);
        let destination = table.point(connection.destination);

        match (origin, destination) {
            (Some(origin), Some(destination)) => Some(service.get_route(
                Waypoint::new(connection.origin, origin),
                Waypoint::new(connection.destination, destination),
                connection.start,
                connection.end,
            )),
            _ => {
                warn!(
                    "No coordinates for {} -> {}, skipping segment",
                    connection.origin, connection.destination
                );
                None
            }
        }
    });

    join_all(requests).await
}
