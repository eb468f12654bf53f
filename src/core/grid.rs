//! Snapping of query points to grid-cell identities.
//!
//! Two strategies exist. [`ResolutionStrategy::Distance`] asks the store for
//! cells whose stored geometry lies inside a small window around the point and
//! picks the closest one. [`ResolutionStrategy::Arithmetic`] rounds each axis to
//! the nearest 0.05-offset lattice value without touching the store.
//!
//! On exact lattice centres both return the input unchanged. Off-lattice they
//! can disagree: the distance strategy follows whatever geometry the store
//! holds, the arithmetic one assumes a perfectly regular grid.

use crate::domain::model::{
    BoundingWindow, CellCandidate, GridCell, QueryPoint, StrategyKind, CELL_CENTRE_OFFSET_DEG,
    CELL_SIZE_DEG,
};
use crate::domain::ports::{EmissionsStore, StrategyPreference};
use crate::utils::error::{EmissionsError, Result};
use std::cmp::Ordering;

/// Half-width of the candidate window, one cell in each direction.
pub const DEFAULT_SEARCH_WINDOW_DEG: f64 = 0.1;

/// Distances closer than this are treated as ties.
pub const DISTANCE_TIE_EPSILON: f64 = 1e-9;

// outermost centres, in hundredths of a degree
const MAX_LAT_CENTRE_HUNDREDTHS: i64 = 8995;
const MAX_LON_CENTRE_HUNDREDTHS: i64 = 17995;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolutionStrategy {
    Distance { search_window_deg: f64 },
    Arithmetic,
}

impl ResolutionStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Distance { .. } => StrategyKind::Distance,
            Self::Arithmetic => StrategyKind::Arithmetic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridResolver {
    strategy: ResolutionStrategy,
}

impl GridResolver {
    pub fn new(strategy: ResolutionStrategy) -> Self {
        Self { strategy }
    }

    pub fn arithmetic() -> Self {
        Self::new(ResolutionStrategy::Arithmetic)
    }

    /// Picks the strategy once for the lifetime of the resolver.
    ///
    /// A missing spatial capability is not an error: the resolver falls back to
    /// arithmetic snapping. Any other probe failure propagates.
    pub fn detect<S: EmissionsStore + ?Sized>(
        store: &S,
        preference: StrategyPreference,
        search_window_deg: f64,
    ) -> Result<Self> {
        if preference == StrategyPreference::Arithmetic {
            tracing::info!("Grid resolution: arithmetic snapping (configured)");
            return Ok(Self::arithmetic());
        }

        match store.probe_spatial() {
            Ok(()) => {
                tracing::info!(
                    "Grid resolution: nearest stored geometry within ±{}°",
                    search_window_deg
                );
                Ok(Self::new(ResolutionStrategy::Distance { search_window_deg }))
            }
            Err(EmissionsError::NoCapability { capability }) => {
                if preference == StrategyPreference::Distance {
                    tracing::warn!(
                        "Distance strategy requested but '{}' capability is unavailable, using arithmetic snapping",
                        capability
                    );
                } else {
                    tracing::info!(
                        "No '{}' capability on store, using arithmetic snapping",
                        capability
                    );
                }
                Ok(Self::arithmetic())
            }
            Err(e) => Err(e),
        }
    }

    pub fn strategy(&self) -> ResolutionStrategy {
        self.strategy
    }

    pub fn active_strategy(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn resolve<S: EmissionsStore + ?Sized>(&self, store: &S, point: QueryPoint) -> Result<GridCell> {
        validate_point(point)?;

        match self.strategy {
            ResolutionStrategy::Arithmetic => Ok(snap_point(point)),
            ResolutionStrategy::Distance { search_window_deg } => {
                if GridCell::new(point.lat, point.lon).is_lattice_centre() {
                    return Ok(snap_point(point));
                }

                let window = BoundingWindow::around(point, search_window_deg);
                let candidates = store.cells_within(&window)?;
                tracing::debug!(
                    "{} candidate cells within ±{}° of ({}, {})",
                    candidates.len(),
                    search_window_deg,
                    point.lat,
                    point.lon
                );

                match nearest_candidate(point, &candidates) {
                    Some(cell) => Ok(cell),
                    None => {
                        tracing::debug!("No stored geometry near the point, snapping arithmetically");
                        Ok(snap_point(point))
                    }
                }
            }
        }
    }
}

pub fn validate_point(point: QueryPoint) -> Result<()> {
    let reason = if !point.lat.is_finite() || !point.lon.is_finite() {
        Some("coordinates must be finite")
    } else if !(-90.0..=90.0).contains(&point.lat) {
        Some("latitude must be within [-90, 90]")
    } else if !(-180.0..=180.0).contains(&point.lon) {
        Some("longitude must be within [-180, 180]")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(EmissionsError::InvalidPoint {
            lat: point.lat,
            lon: point.lon,
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Nearest lattice centre on one axis, as the double closest to `k / 100`.
///
/// Building the value from an integer keeps it bit-equal to a key parsed from
/// decimal text such as `-27.45`. A value exactly on a cell edge rounds to the
/// even index, so 0.0 and 0.1 both land on 0.05.
pub fn snap_to_centre(value: f64, max_centre_hundredths: i64) -> f64 {
    let index = ((value - CELL_CENTRE_OFFSET_DEG) / CELL_SIZE_DEG).round_ties_even() as i64;
    let hundredths = (index * 10 + 5).clamp(-max_centre_hundredths, max_centre_hundredths);
    hundredths as f64 / 100.0
}

pub fn snap_point(point: QueryPoint) -> GridCell {
    GridCell::new(
        snap_to_centre(point.lat, MAX_LAT_CENTRE_HUNDREDTHS),
        snap_to_centre(point.lon, MAX_LON_CENTRE_HUNDREDTHS),
    )
}

/// Closest candidate by planar distance in degrees; ties go to the smaller (lat, lon).
pub fn nearest_candidate(point: QueryPoint, candidates: &[CellCandidate]) -> Option<GridCell> {
    let mut best: Option<(GridCell, f64)> = None;

    for candidate in candidates {
        let distance = (candidate.location.lat - point.lat).hypot(candidate.location.lon - point.lon);
        if !distance.is_finite() {
            continue;
        }

        best = match best {
            None => Some((candidate.cell, distance)),
            Some((cell, best_distance)) => {
                let closer = distance < best_distance - DISTANCE_TIE_EPSILON;
                let tied = (distance - best_distance).abs() <= DISTANCE_TIE_EPSILON;
                if closer || (tied && candidate.cell.lexicographic_cmp(&cell) == Ordering::Less) {
                    Some((candidate.cell, distance))
                } else {
                    Some((cell, best_distance))
                }
            }
        };
    }

    best.map(|(cell, _)| cell)
}
