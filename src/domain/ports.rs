use crate::domain::model::{BoundingWindow, CellCandidate, GridCell, ResolvedSeries};
use crate::utils::error::{EmissionsError, Result};
use std::collections::BTreeMap;

/// Capability name reported when a store cannot answer geometric queries.
pub const SPATIAL_CAPABILITY: &str = "spatial";

/// Read-only access to the externally materialized `emissions` table.
///
/// Series are `sum(emission) group by year`, year ascending. Years with no
/// rows are omitted rather than reported as zero.
pub trait EmissionsStore {
    fn series_for(&self, cell: &GridCell, substance: &str, sector: &str) -> Result<ResolvedSeries>;

    /// Per-year sum across `sectors`. An empty sector set yields an empty series.
    fn aggregate_series_for(
        &self,
        cell: &GridCell,
        substance: &str,
        sectors: &[String],
    ) -> Result<ResolvedSeries>;

    /// Summed emission per sector over every cell and year of `substance`.
    fn sector_totals(&self, substance: &str) -> Result<BTreeMap<String, f64>>;

    fn has_sector(&self, cell: &GridCell, substance: &str, sector: &str) -> Result<bool>;

    fn cell_exists(&self, cell: &GridCell) -> Result<bool>;

    /// Checks once whether geometric candidate queries are supported.
    fn probe_spatial(&self) -> Result<()> {
        Err(EmissionsError::no_capability(SPATIAL_CAPABILITY))
    }

    /// Distinct cells whose stored geometry falls inside `window`.
    fn cells_within(&self, _window: &BoundingWindow) -> Result<Vec<CellCandidate>> {
        Err(EmissionsError::no_capability(SPATIAL_CAPABILITY))
    }
}

impl<S: EmissionsStore + ?Sized> EmissionsStore for Box<S> {
    fn series_for(&self, cell: &GridCell, substance: &str, sector: &str) -> Result<ResolvedSeries> {
        (**self).series_for(cell, substance, sector)
    }

    fn aggregate_series_for(
        &self,
        cell: &GridCell,
        substance: &str,
        sectors: &[String],
    ) -> Result<ResolvedSeries> {
        (**self).aggregate_series_for(cell, substance, sectors)
    }

    fn sector_totals(&self, substance: &str) -> Result<BTreeMap<String, f64>> {
        (**self).sector_totals(substance)
    }

    fn has_sector(&self, cell: &GridCell, substance: &str, sector: &str) -> Result<bool> {
        (**self).has_sector(cell, substance, sector)
    }

    fn cell_exists(&self, cell: &GridCell) -> Result<bool> {
        (**self).cell_exists(cell)
    }

    fn probe_spatial(&self) -> Result<()> {
        (**self).probe_spatial()
    }

    fn cells_within(&self, window: &BoundingWindow) -> Result<Vec<CellCandidate>> {
        (**self).cells_within(window)
    }
}

/// Boundary I/O for exported artifacts.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Strategy requested by configuration; `Auto` probes the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum StrategyPreference {
    #[default]
    Auto,
    Distance,
    Arithmetic,
}

pub trait ConfigProvider: Send + Sync {
    fn store_path(&self) -> &str;
    fn strategy_preference(&self) -> StrategyPreference;
    fn search_window_deg(&self) -> f64;
    fn dominant_sector_limit(&self) -> usize;
    fn output_path(&self) -> &str;
    fn export_precision(&self) -> usize;
}
