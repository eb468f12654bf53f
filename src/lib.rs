pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

#[cfg(feature = "sqlite")]
pub use adapters::sqlite::SqliteStore;
pub use adapters::{memory::MemoryStore, open_store, storage::LocalStorage};
pub use crate::core::{
    export::TimeSeriesExporter, grid::GridResolver, query::EmissionsQuery, sectors::SectorSelector,
};
pub use utils::error::{EmissionsError, Result};
