#![cfg(feature = "sqlite")]

use anyhow::Result;
use grid_emissions::core::{
    EffectiveQuery, EmissionsStore, GridCell, QueryPoint, SectorChoice, SeriesPoint, StrategyKind,
};
use grid_emissions::{open_store, EmissionsError, EmissionsQuery, TomlConfig};
use rusqlite::{params, Connection};
use tempfile::TempDir;

fn create_store(dir: &TempDir, rows: &[(f64, f64, i32, &str, &str, f64)]) -> Result<String> {
    let path = dir.path().join("edgar.db");
    let conn = Connection::open(&path)?;
    conn.execute_batch(
        "CREATE TABLE emissions (
            lat DOUBLE, lon DOUBLE, year INTEGER,
            substance TEXT, sector TEXT, emission DOUBLE, location BLOB
        );
        CREATE INDEX idx_emissions_cell ON emissions (lat, lon, substance, sector);",
    )?;
    for (lat, lon, year, substance, sector, emission) in rows {
        conn.execute(
            "INSERT INTO emissions (lat, lon, year, substance, sector, emission) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![lat, lon, year, substance, sector, emission],
        )?;
    }
    Ok(path.to_str().unwrap().to_string())
}

fn engine(path: &str) -> Result<EmissionsQuery<Box<dyn EmissionsStore>>> {
    let config = TomlConfig::from_toml_str(&format!("[store]\npath = {:?}\n", path))?;
    Ok(EmissionsQuery::from_config(open_store(path)?, &config)?)
}

#[test]
fn test_plain_sqlite_falls_back_to_arithmetic() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = create_store(&temp_dir, &[(-27.45, 153.05, 2020, "CH4", "ENF", 10.0)])?;

    let engine = engine(&path)?;
    assert_eq!(engine.active_strategy(), StrategyKind::Arithmetic);

    let outcome = engine.run(QueryPoint::new(-27.4698, 153.0251), "CH4", &SectorChoice::sector("ENF"))?;
    assert_eq!(outcome.cell, GridCell::new(-27.45, 153.05));
    assert_eq!(outcome.series.points(), &[SeriesPoint { year: 2020, emission: 10.0 }]);
    Ok(())
}

#[test]
fn test_totals_preferred_then_dominant_sectors() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = create_store(
        &temp_dir,
        &[
            (-27.45, 153.05, 2020, "CH4", "ENF", 10.0),
            (-27.45, 153.05, 2020, "CH4", "IND", 5.0),
            (-27.45, 153.05, 2020, "CH4", "TOTALS", 20.0),
            (-27.35, 153.05, 2020, "CH4", "ENF", 2.0),
            (-27.35, 153.05, 2021, "CH4", "ENF", 3.0),
            (-27.35, 153.05, 2021, "CH4", "IND", 1.0),
        ],
    )?;
    let engine = engine(&path)?;

    let with_totals = engine.run(QueryPoint::new(-27.4698, 153.0251), "CH4", &SectorChoice::All)?;
    assert_eq!(
        with_totals.effective,
        EffectiveQuery::Single {
            sector: "TOTALS".to_string()
        }
    );
    assert_eq!(with_totals.most_recent.map(|p| p.emission), Some(20.0));

    let without_totals = engine.run(QueryPoint::new(-27.33, 153.07), "CH4", &SectorChoice::All)?;
    assert_eq!(without_totals.cell, GridCell::new(-27.35, 153.05));
    assert_eq!(
        without_totals.effective,
        EffectiveQuery::Aggregate {
            sectors: vec!["ENF".to_string(), "IND".to_string()],
            limit: 8,
        }
    );
    assert_eq!(
        without_totals.series.points(),
        &[
            SeriesPoint { year: 2020, emission: 2.0 },
            SeriesPoint { year: 2021, emission: 4.0 },
        ]
    );
    Ok(())
}

#[test]
fn test_missing_database_is_store_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.db");

    let result = open_store(path.to_str().unwrap());
    assert!(matches!(result, Err(EmissionsError::StoreUnavailable { .. })));
}

#[test]
fn test_store_is_opened_read_only() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = create_store(&temp_dir, &[(0.05, 0.05, 2020, "N2O", "AGS", 1.0)])?;

    let store = grid_emissions::SqliteStore::open(&path)?;
    assert_eq!(store.location(), path);
    assert_eq!(store.sector_totals("N2O")?.get("AGS"), Some(&1.0));
    Ok(())
}
