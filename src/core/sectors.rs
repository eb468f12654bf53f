//! Sector listing and resolution of the "all sectors" request.
//!
//! "ALL" prefers the inventory's own TOTALS row for the cell. Without one it
//! sums the dominant sectors of the substance, ranked globally by total
//! emission. The ranking itself is a pure function over a snapshot of totals.

use crate::domain::model::{EffectiveQuery, GridCell, SectorChoice, TOTALS_SECTOR};
use crate::domain::ports::EmissionsStore;
use crate::utils::error::Result;
use std::collections::BTreeMap;

/// Number of sectors summed when no TOTALS row exists.
pub const DEFAULT_DOMINANT_SECTOR_LIMIT: usize = 8;

/// Sectors with a positive total, largest first, ties by code. TOTALS is skipped.
pub fn rank_sectors(totals: &BTreeMap<String, f64>) -> Vec<String> {
    let mut ranked: Vec<(&String, f64)> = totals
        .iter()
        .filter(|(sector, total)| sector.as_str() != TOTALS_SECTOR && **total > 0.0)
        .map(|(sector, total)| (sector, *total))
        .collect();

    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().map(|(sector, _)| sector.clone()).collect()
}

pub fn dominant_sectors(totals: &BTreeMap<String, f64>, limit: usize) -> Vec<String> {
    let mut ranked = rank_sectors(totals);
    ranked.truncate(limit);
    ranked
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorSelector {
    dominant_limit: usize,
}

impl Default for SectorSelector {
    fn default() -> Self {
        Self::new(DEFAULT_DOMINANT_SECTOR_LIMIT)
    }
}

impl SectorSelector {
    pub fn new(dominant_limit: usize) -> Self {
        Self { dominant_limit }
    }

    pub fn dominant_limit(&self) -> usize {
        self.dominant_limit
    }

    /// "ALL" followed by every sector with positive emission for `substance`.
    pub fn list_sectors<S: EmissionsStore + ?Sized>(
        &self,
        store: &S,
        substance: &str,
    ) -> Result<Vec<SectorChoice>> {
        let totals = store.sector_totals(substance)?;
        let mut choices = vec![SectorChoice::All];
        choices.extend(rank_sectors(&totals).into_iter().map(SectorChoice::Sector));
        Ok(choices)
    }

    pub fn resolve<S: EmissionsStore + ?Sized>(
        &self,
        store: &S,
        substance: &str,
        requested: &SectorChoice,
        cell: &GridCell,
    ) -> Result<EffectiveQuery> {
        let sector = match requested {
            SectorChoice::Sector(code) => {
                return Ok(EffectiveQuery::Single {
                    sector: code.clone(),
                })
            }
            SectorChoice::All => TOTALS_SECTOR,
        };

        if store.has_sector(cell, substance, sector)? {
            tracing::debug!("Using {} row for {} at {}", TOTALS_SECTOR, substance, cell);
            return Ok(EffectiveQuery::Single {
                sector: sector.to_string(),
            });
        }

        let totals = store.sector_totals(substance)?;
        let sectors = dominant_sectors(&totals, self.dominant_limit);
        tracing::debug!(
            "No {} row for {} at {}, summing {} dominant sectors",
            TOTALS_SECTOR,
            substance,
            cell,
            sectors.len()
        );

        Ok(EffectiveQuery::Aggregate {
            sectors,
            limit: self.dominant_limit,
        })
    }
}
