pub mod export;
pub mod grid;
pub mod query;
pub mod sectors;

pub use crate::domain::model::{
    EffectiveQuery, EmissionRecord, GridCell, QueryOutcome, QueryPoint, ResolvedSeries,
    SectorChoice, SeriesPoint, StrategyKind,
};
pub use crate::domain::ports::{ConfigProvider, EmissionsStore, Storage, StrategyPreference};
pub use crate::utils::error::Result;
