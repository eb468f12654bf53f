use crate::core::export::{ExportArtifact, ExportMeta, TimeSeriesExporter};
use crate::core::grid::{self, GridResolver};
use crate::core::sectors::SectorSelector;
use crate::domain::model::{
    EffectiveQuery, GridCell, QueryOutcome, QueryPoint, SectorChoice, StrategyKind,
};
use crate::domain::ports::{ConfigProvider, EmissionsStore};
use crate::utils::error::{EmissionsError, Result};

/// One click in, one series out.
///
/// The resolution strategy is chosen when the engine is built and never
/// re-probed. Each call is independent; nothing is cached between clicks.
pub struct EmissionsQuery<S: EmissionsStore> {
    store: S,
    resolver: GridResolver,
    selector: SectorSelector,
    exporter: TimeSeriesExporter,
}

impl<S: EmissionsStore> EmissionsQuery<S> {
    pub fn new(store: S, resolver: GridResolver, selector: SectorSelector, exporter: TimeSeriesExporter) -> Self {
        Self {
            store,
            resolver,
            selector,
            exporter,
        }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(store: S, config: &C) -> Result<Self> {
        let resolver = GridResolver::detect(
            &store,
            config.strategy_preference(),
            config.search_window_deg(),
        )?;
        Ok(Self::new(
            store,
            resolver,
            SectorSelector::new(config.dominant_sector_limit()),
            TimeSeriesExporter::new(config.export_precision()),
        ))
    }

    pub fn active_strategy(&self) -> StrategyKind {
        self.resolver.active_strategy()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn list_sectors(&self, substance: &str) -> Result<Vec<SectorChoice>> {
        validate_substance(substance)?;
        self.selector.list_sectors(&self.store, substance)
    }

    pub fn resolve_cell(&self, point: QueryPoint) -> Result<GridCell> {
        let cell = self.resolver.resolve(&self.store, point)?;

        if self.resolver.active_strategy() == StrategyKind::Arithmetic && !self.store.cell_exists(&cell)? {
            tracing::warn!(
                "Snapped centre ({}) is not in the store; the series will be empty",
                cell
            );
        }
        Ok(cell)
    }

    /// Resolves the clicked point and fetches its series.
    pub fn run(&self, point: QueryPoint, substance: &str, sector: &SectorChoice) -> Result<QueryOutcome> {
        grid::validate_point(point)?;
        validate_substance(substance)?;

        let cell = self.resolve_cell(point)?;
        tracing::debug!(
            "Clicked ({:.5}, {:.5}) resolved to cell ({}) via {}",
            point.lat,
            point.lon,
            cell,
            self.active_strategy()
        );

        let mut outcome = self.run_for_cell(cell, substance, sector)?;
        outcome.point = Some(point);
        Ok(outcome)
    }

    /// Re-queries an already resolved cell, e.g. after the sector selection changed.
    pub fn run_for_cell(&self, cell: GridCell, substance: &str, sector: &SectorChoice) -> Result<QueryOutcome> {
        validate_substance(substance)?;

        let effective = self.selector.resolve(&self.store, substance, sector, &cell)?;
        let series = match &effective {
            EffectiveQuery::Single { sector } => self.store.series_for(&cell, substance, sector)?,
            EffectiveQuery::Aggregate { sectors, .. } => {
                self.store.aggregate_series_for(&cell, substance, sectors)?
            }
        };

        if series.is_empty() {
            tracing::info!(
                "No {} data for {} at ({})",
                substance,
                effective.label(),
                cell
            );
        }

        Ok(QueryOutcome {
            point: None,
            cell,
            substance: substance.to_string(),
            strategy: self.active_strategy(),
            most_recent: series.most_recent(),
            effective,
            series,
        })
    }

    pub fn export(&self, outcome: &QueryOutcome) -> Result<ExportArtifact> {
        let meta = ExportMeta {
            substance: outcome.substance.clone(),
            sector: outcome.effective.label().to_string(),
            cell: outcome.cell,
        };
        self.exporter.export(&outcome.series, &meta)
    }
}

fn validate_substance(substance: &str) -> Result<()> {
    if substance.trim().is_empty() {
        return Err(EmissionsError::ValidationError {
            message: "substance cannot be empty".to_string(),
        });
    }
    Ok(())
}
