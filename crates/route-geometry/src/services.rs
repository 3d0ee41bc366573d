//! Async boundaries to external services
//!
//! The engine itself is synchronous. Elevation lookups, DEM tile priming and routing are
//! modeled as traits the host implements, plus small drivers that batch requests, apply
//! timeouts and retries, and hand results back keyed by [`PointId`].
//!
//! # Architecture
//!
//! Every driver works in two phases: it takes a list of `(PointId, LatLng)` requests collected
//! from the route, awaits the service, and returns a report of results by id. Applying the
//! report is a separate synchronous call on the route, so edits may run while requests are in
//! flight; results for points deleted in the meantime are dropped.
//!
//! Failures never touch already resolved points: a point is only marked once its own result
//! has arrived.

use crate::config::{ElevationConfig, TileConfig};
use crate::polyline::PolylineCodec;
use crate::utils::TileKey;
use crate::{GeometryError, LatLng, PathPoint, PointId, Result, Route};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

/// Failure of one external service call
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("Service call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Service rejected the request: {0}")]
    Rejected(String),

    #[error("Service returned {actual} results for {expected} requests")]
    LengthMismatch { expected: usize, actual: usize },
}

impl ServiceError {
    /// Whether the same request may succeed later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Rejected(_))
    }
}

/// Point elevation lookup
pub trait ElevationService {
    /// Largest number of positions accepted per call
    fn batch_limit(&self) -> usize;

    /// One entry per position, in order; `None` where the service has no value
    fn altitudes(
        &self,
        positions: &[LatLng],
    ) -> impl Future<Output = std::result::Result<Vec<Option<f64>>, ServiceError>> + Send;
}

/// Road routing between control points
pub trait RoutingService {
    /// Polyline without altitude channel through `controls`
    fn route(
        &self,
        controls: &[LatLng],
    ) -> impl Future<Output = std::result::Result<String, ServiceError>> + Send;
}

/// DEM tile cache warm-up
pub trait TileService {
    fn prime(
        &self,
        tile: TileKey,
    ) -> impl Future<Output = std::result::Result<(), ServiceError>> + Send;
}

/// Outcome of one altitude resolution round
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AltitudeReport {
    /// Altitudes to install with [`Route::apply_altitudes`]
    pub resolved: Vec<(PointId, f64)>,
    /// Points left for a later round
    pub pending: Vec<PointId>,
    /// Errors of the failed batches
    pub errors: Vec<ServiceError>,
}

/// Batches uncorrected points to an [`ElevationService`]
#[derive(Debug, Clone)]
pub struct AltitudeResolver<S> {
    service: S,
    config: ElevationConfig,
}

impl<S: ElevationService> AltitudeResolver<S> {
    pub fn new(service: S, config: ElevationConfig) -> Self {
        Self { service, config }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Points of `route` the next round should submit
    pub fn collect(&self, route: &Route) -> Vec<(PointId, LatLng)> {
        route.pending_altitudes(self.config.max_points_per_request)
    }

    fn chunk_size(&self) -> usize {
        self.config
            .batch_size
            .min(self.service.batch_limit())
            .max(1)
    }

    /// Query the service for `requests`, chunked to the batch limit
    ///
    /// Each chunk gets the configured timeout; a timed out or failed chunk leaves its points
    /// pending without affecting the other chunks.
    pub async fn resolve_requests(&self, requests: &[(PointId, LatLng)]) -> AltitudeReport {
        let mut report = AltitudeReport::default();

        for chunk in requests.chunks(self.chunk_size()) {
            let positions: Vec<LatLng> = chunk.iter().map(|(_, position)| *position).collect();
            let result =
                match tokio::time::timeout(self.config.timeout, self.service.altitudes(&positions))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ServiceError::Timeout(self.config.timeout)),
                };

            let altitudes = match result {
                Ok(altitudes) if altitudes.len() == chunk.len() => altitudes,
                Ok(altitudes) => {
                    let error = ServiceError::LengthMismatch {
                        expected: chunk.len(),
                        actual: altitudes.len(),
                    };
                    tracing::warn!("Discarding elevation batch: {}", error);
                    report.pending.extend(chunk.iter().map(|(id, _)| *id));
                    report.errors.push(error);
                    continue;
                }
                Err(error) => {
                    tracing::warn!("Elevation batch of {} points failed: {}", chunk.len(), error);
                    report.pending.extend(chunk.iter().map(|(id, _)| *id));
                    report.errors.push(error);
                    continue;
                }
            };

            for ((id, _), altitude) in chunk.iter().zip(altitudes) {
                match altitude {
                    Some(alt) => report.resolved.push((*id, alt)),
                    None => report.pending.push(*id),
                }
            }
        }

        tracing::debug!(
            resolved = report.resolved.len(),
            pending = report.pending.len(),
            "Elevation round finished"
        );
        report
    }

    /// Run one full round against `route` and install the results
    pub async fn resolve(&self, route: &mut Route) -> AltitudeReport {
        let requests = self.collect(route);
        let report = self.resolve_requests(&requests).await;
        route.apply_altitudes(&report.resolved);
        report
    }
}

/// Outcome of one tile priming round
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TileReport {
    /// Points whose tile is now cached, for [`Route::mark_dem_cached`]
    pub cached: Vec<PointId>,
    /// Tiles that kept failing
    pub failed: Vec<TileKey>,
}

/// Warms the DEM tile cache for the tiles a route crosses
#[derive(Debug, Clone)]
pub struct TilePrimer<S> {
    service: S,
    config: TileConfig,
}

impl<S: TileService> TilePrimer<S> {
    pub fn new(service: S, config: TileConfig) -> Self {
        Self { service, config }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Group `requests` by tile at the configured zoom
    pub fn tiles_for(&self, requests: &[(PointId, LatLng)]) -> BTreeMap<TileKey, Vec<PointId>> {
        let mut tiles: BTreeMap<TileKey, Vec<PointId>> = BTreeMap::new();
        for (id, position) in requests {
            tiles
                .entry(TileKey::containing(*position, self.config.zoom))
                .or_default()
                .push(*id);
        }
        tiles
    }

    /// Prime every tile touched by `requests`
    ///
    /// Retryable failures back off exponentially from `base_backoff`; a tile that still fails
    /// after `max_attempts` is reported and skipped.
    pub async fn prime_requests(&self, requests: &[(PointId, LatLng)]) -> TileReport {
        let mut report = TileReport::default();

        for (tile, ids) in self.tiles_for(requests) {
            if self.prime_tile(tile).await {
                report.cached.extend(ids);
            } else {
                report.failed.push(tile);
            }
        }

        tracing::debug!(
            cached = report.cached.len(),
            failed = report.failed.len(),
            "Tile priming finished"
        );
        report
    }

    async fn prime_tile(&self, tile: TileKey) -> bool {
        let attempts = self.config.max_attempts.max(1);
        let mut backoff = self.config.base_backoff;

        for attempt in 1..=attempts {
            match self.service.prime(tile).await {
                Ok(()) => return true,
                Err(error) if error.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        "Priming tile {}/{}/{} failed (attempt {}/{}): {}",
                        tile.z,
                        tile.x,
                        tile.y,
                        attempt,
                        attempts,
                        error
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(error) => {
                    tracing::warn!(
                        "Giving up on tile {}/{}/{}: {}",
                        tile.z,
                        tile.x,
                        tile.y,
                        error
                    );
                    return false;
                }
            }
        }
        false
    }

    /// Prime the tiles of every point of `route` not cached yet and mark them
    pub async fn prime(&self, route: &mut Route) -> TileReport {
        let requests = route.pending_dem();
        let report = self.prime_requests(&requests).await;
        route.mark_dem_cached(&report.cached);
        report
    }
}

/// Ask `service` for a path through `controls`, for use with [`Route::subpath_replace`]
pub async fn fetch_replacement_path<R: RoutingService>(
    service: &R,
    controls: &[LatLng],
    timeout: Duration,
) -> Result<Vec<PathPoint>> {
    let encoded = match tokio::time::timeout(timeout, service.route(controls)).await {
        Ok(result) => result?,
        Err(_) => return Err(GeometryError::Service(ServiceError::Timeout(timeout))),
    };
    Ok(PolylineCodec::without_altitude().decode(&encoded)?)
}
