//! Cached, time-stamped routes between diary places
//!
//! Geometry does not depend on when a trip happened, so it is fetched once per
//! ordered (origin, destination) pair and re-stamped for every new time window.
//! Every pair owns a `OnceCell`: concurrent requests for the same pair share one
//! provider call while different pairs proceed independently. Failed fetches
//! leave the cell empty so a later request can try again.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

use super::RouteProvider;
use crate::Result;
use crate::geometry::{Point, distance};

/// A named place with its resolved coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint<'a> {
    pub name: &'a str,
    pub point: Point,
}

impl<'a> Waypoint<'a> {
    #[must_use]
    pub fn new(name: &'a str, point: Point) -> Self {
        Self { name, point }
    }
}

/// A route point with its interpolated time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPoint {
    pub point: Point,
    pub time: DateTime<Utc>,
}

/// Ordered, time-stamped points of one trip
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub points: Vec<TimedPoint>,
    /// Total path length in metres
    pub distance_m: f64,
}

impl Route {
    /// An empty route means no segment could be produced
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    origin: String,
    destination: String,
}

#[derive(Debug)]
struct Geometry {
    points: Vec<Point>,
    distance_m: f64,
}

type Slot = Arc<OnceCell<Geometry>>;

/// Route fetching with a per-run geometry cache
pub struct RouteService {
    provider: Arc<dyn RouteProvider>,
    cache: Mutex<HashMap<RouteKey, Slot>>,
}

impl RouteService {
    pub fn new(provider: Arc<dyn RouteProvider>) -> Self {
        Self {
            provider,
            cache: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Number of ordered pairs with cached geometry
    #[must_use]
    pub fn cached_routes(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Route from `origin` to `destination` leaving at `start` and arriving at `end`.
    ///
    /// Returns an empty route when the provider fails; the caller treats that as a
    /// missing segment.
    #[instrument(skip_all, fields(origin = origin.name, destination = destination.name))]
    pub async fn get_route(
        &self,
        origin: Waypoint<'_>,
        destination: Waypoint<'_>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Route {
        let slot = self.slot(origin.name, destination.name);
        if slot.initialized() {
            debug!("Route found in cache");
        }

        let geometry = slot
            .get_or_try_init(|| self.fetch_geometry(&origin.point, &destination.point))
            .await;

        match geometry {
            Ok(geometry) => Route {
                points: interpolate(&geometry.points, geometry.distance_m, start, end),
                distance_m: geometry.distance_m,
            },
            Err(e) => {
                warn!(
                    "No route from {} to {}: {}",
                    origin.name, destination.name, e
                );
                Route::default()
            }
        }
    }

    fn slot(&self, origin: &str, destination: &str) -> Slot {
        let key = RouteKey {
            origin: origin.to_string(),
            destination: destination.to_string(),
        };
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone()
    }

    async fn fetch_geometry(&self, origin: &Point, destination: &Point) -> Result<Geometry> {
        let raw = self.provider.fetch(origin, destination).await?;
        debug!(
            "Fetched route with {} points, {:.0} m, {:.0} s",
            raw.points.len(),
            raw.distance_m,
            raw.duration_s
        );

        Ok(Geometry {
            points: raw.points,
            distance_m: raw.distance_m,
        })
    }
}

/// Stamp `points` assuming constant speed over `distance_m` between `start` and `end`.
///
/// The last point always gets exactly `end`. Without a positive window every other
/// point stays at `start`.
#[must_use]
pub fn interpolate(
    points: &[Point],
    distance_m: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<TimedPoint> {
    let Some((last, rest)) = points.split_last() else {
        return Vec::new();
    };

    let seconds = (end - start).num_milliseconds() as f64 / 1000.0;
    let speed = if seconds > 0.0 { distance_m / seconds } else { 0.0 };

    let mut timed = Vec::with_capacity(points.len());
    let mut timestamp = start;
    for (point, next) in rest.iter().zip(&points[1..]) {
        timed.push(TimedPoint {
            point: *point,
            time: timestamp,
        });

        if speed > 0.0 && speed.is_finite() {
            let step_seconds = distance(point, next) * 1000.0 / speed;
            timestamp += TimeDelta::milliseconds((step_seconds * 1000.0).round() as i64);
        }
    }

    timed.push(TimedPoint {
        point: *last,
        time: end,
    });
    timed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrackError;
    use crate::routing::RawRoute;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 1, h, m, 0).unwrap()
    }

    fn meridian_points() -> Vec<Point> {
        vec![Point::new(0.0, 0.0), Point::new(0.1, 0.0), Point::new(0.2, 0.0)]
    }

    fn path_length_m(points: &[Point]) -> f64 {
        points.windows(2).map(|w| distance(&w[0], &w[1])).sum::<f64>() * 1000.0
    }

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
        delay: Duration,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RouteProvider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch(&self, _origin: &Point, _destination: &Point) -> Result<RawRoute> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(TrackError::api("HTTP 500"));
            }
            let points = meridian_points();
            Ok(RawRoute {
                distance_m: path_length_m(&points),
                duration_s: 1800.0,
                points,
            })
        }
    }

    fn home() -> Waypoint<'static> {
        Waypoint::new("Home", Point::new(0.0, 0.0))
    }

    fn work() -> Waypoint<'static> {
        Waypoint::new("Work", Point::new(0.2, 0.0))
    }

    #[tokio::test]
    async fn test_same_pair_is_fetched_once_and_restamped() {
        let provider = Arc::new(CountingProvider::new());
        let service = RouteService::new(provider.clone());

        let morning = service.get_route(home(), work(), at(7, 30), at(8, 0)).await;
        let evening = service.get_route(home(), work(), at(18, 0), at(19, 0)).await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(service.cached_routes(), 1);

        let geometry = |route: &Route| route.points.iter().map(|p| p.point).collect::<Vec<_>>();
        assert_eq!(geometry(&morning), geometry(&evening));
        assert_ne!(morning.points[0].time, evening.points[0].time);

        assert_eq!(morning.points.last().unwrap().time, at(8, 0));
        assert_eq!(evening.points.last().unwrap().time, at(19, 0));
        assert_eq!(morning.points[0].time, at(7, 30));
        assert_eq!(evening.points[0].time, at(18, 0));
    }

    #[tokio::test]
    async fn test_pair_order_matters() {
        let provider = Arc::new(CountingProvider::new());
        let service = RouteService::new(provider.clone());

        service.get_route(home(), work(), at(7, 30), at(8, 0)).await;
        service.get_route(work(), home(), at(18, 0), at(18, 30)).await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(service.cached_routes(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_gives_empty_route_and_is_retried() {
        let provider = Arc::new(CountingProvider {
            fail: true,
            ..CountingProvider::new()
        });
        let service = RouteService::new(provider.clone());

        let route = service.get_route(home(), work(), at(7, 30), at(8, 0)).await;
        assert!(route.is_empty());
        assert_eq!(service.cached_routes(), 0);

        service.get_route(home(), work(), at(9, 30), at(10, 0)).await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let provider = Arc::new(CountingProvider {
            delay: Duration::from_millis(50),
            ..CountingProvider::new()
        });
        let service = RouteService::new(provider.clone());

        let (a, b, c) = tokio::join!(
            service.get_route(home(), work(), at(7, 30), at(8, 0)),
            service.get_route(home(), work(), at(12, 0), at(12, 45)),
            service.get_route(work(), home(), at(18, 0), at(18, 30)),
        );

        assert_eq!(provider.calls(), 2);
        assert_eq!(a.points.last().unwrap().time, at(8, 0));
        assert_eq!(b.points.last().unwrap().time, at(12, 45));
        assert_eq!(c.points.last().unwrap().time, at(18, 30));
    }

    #[test]
    fn test_interpolate_constant_speed() {
        let points = meridian_points();
        let timed = interpolate(&points, path_length_m(&points), at(8, 0), at(9, 0));

        assert_eq!(timed.len(), 3);
        assert_eq!(timed[0].time, at(8, 0));
        let midpoint_offset = (timed[1].time - at(8, 30)).num_milliseconds().abs();
        assert!(midpoint_offset <= 1, "midpoint off by {midpoint_offset} ms");
        assert_eq!(timed[2].time, at(9, 0));
    }

    #[test]
    fn test_interpolate_zero_window_keeps_start() {
        let points = meridian_points();
        let timed = interpolate(&points, path_length_m(&points), at(8, 0), at(8, 0));

        assert_eq!(timed[0].time, at(8, 0));
        assert_eq!(timed[1].time, at(8, 0));
        assert_eq!(timed[2].time, at(8, 0));
    }

    #[test]
    fn test_interpolate_single_and_empty() {
        assert!(interpolate(&[], 0.0, at(8, 0), at(9, 0)).is_empty());

        let timed = interpolate(&[Point::new(1.0, 1.0)], 0.0, at(8, 0), at(9, 0));
        assert_eq!(timed.len(), 1);
        assert_eq!(timed[0].time, at(9, 0));
    }
}
