// Adapters layer: concrete stores and boundary storage.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod storage;

use crate::domain::ports::EmissionsStore;
use crate::utils::error::Result;
use crate::utils::validation::validate_file_extension;

pub const STORE_EXTENSIONS: &[&str] = &["csv", "db", "sqlite", "sqlite3"];

/// Opens the store at `path`, picking the backend from the file extension.
pub fn open_store(path: &str) -> Result<Box<dyn EmissionsStore>> {
    validate_file_extension("store.path", path, STORE_EXTENSIONS)?;

    let is_csv = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        return Ok(Box::new(memory::MemoryStore::from_csv_path(path)?));
    }

    #[cfg(feature = "sqlite")]
    {
        Ok(Box::new(sqlite::SqliteStore::open(path)?))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        Err(crate::utils::error::EmissionsError::store_unavailable(
            path,
            "SQLite stores need the 'sqlite' feature",
        ))
    }
}
