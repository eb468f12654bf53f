use anyhow::Result;
use grid_emissions::core::export::parse_csv;
use grid_emissions::core::{
    EffectiveQuery, EmissionRecord, GridCell, QueryPoint, SectorChoice, SeriesPoint, Storage,
    StrategyKind,
};
use grid_emissions::{
    EmissionsError, EmissionsQuery, GridResolver, LocalStorage, MemoryStore, SectorSelector,
    TimeSeriesExporter,
};
use tempfile::TempDir;

const BRISBANE: GridCell = GridCell { lat: -27.45, lon: 153.05 };

fn record(year: i32, sector: &str, emission: f64) -> EmissionRecord {
    EmissionRecord::new(BRISBANE, year, "CH4", sector, emission)
}

fn engine(records: Vec<EmissionRecord>) -> EmissionsQuery<MemoryStore> {
    EmissionsQuery::new(
        MemoryStore::from_records(records),
        GridResolver::arithmetic(),
        SectorSelector::default(),
        TimeSeriesExporter::default(),
    )
}

fn brisbane_click() -> QueryPoint {
    QueryPoint::new(-27.4698, 153.0251)
}

#[test]
fn test_brisbane_click_resolves_to_cell() -> Result<()> {
    let engine = engine(vec![record(2020, "ENF", 1.0)]);
    assert_eq!(engine.active_strategy(), StrategyKind::Arithmetic);

    let outcome = engine.run(brisbane_click(), "CH4", &SectorChoice::All)?;
    assert_eq!(outcome.cell, BRISBANE);
    assert_eq!(outcome.point, Some(brisbane_click()));
    Ok(())
}

#[test]
fn test_all_sectors_uses_totals_row() -> Result<()> {
    let engine = engine(vec![
        record(2022, "ENF", 10.0),
        record(2022, "IND", 5.0),
        record(2022, "TOTALS", 20.0),
    ]);

    let outcome = engine.run(brisbane_click(), "CH4", &SectorChoice::All)?;
    assert_eq!(
        outcome.effective,
        EffectiveQuery::Single {
            sector: "TOTALS".to_string()
        }
    );
    assert_eq!(
        outcome.most_recent,
        Some(SeriesPoint {
            year: 2022,
            emission: 20.0
        })
    );
    Ok(())
}

#[test]
fn test_all_sectors_sums_dominant_sectors_without_totals() -> Result<()> {
    let engine = engine(vec![
        record(2019, "ENF", 10.0),
        record(2020, "ENF", 11.0),
        record(2021, "ENF", 12.0),
        record(2020, "IND", 5.0),
        record(2021, "IND", 6.0),
    ]);

    let outcome = engine.run(brisbane_click(), "CH4", &SectorChoice::All)?;
    assert_eq!(
        outcome.effective,
        EffectiveQuery::Aggregate {
            sectors: vec!["ENF".to_string(), "IND".to_string()],
            limit: 8,
        }
    );
    assert_eq!(
        outcome.series.points(),
        &[
            SeriesPoint { year: 2019, emission: 10.0 },
            SeriesPoint { year: 2020, emission: 16.0 },
            SeriesPoint { year: 2021, emission: 18.0 },
        ]
    );
    Ok(())
}

#[test]
fn test_aggregate_is_limited_to_dominant_sectors() -> Result<()> {
    // ten sectors, S00 largest; only the top eight are summed
    let records: Vec<EmissionRecord> = (0..10)
        .map(|i| record(2020, &format!("S{:02}", i), (10 - i) as f64))
        .collect();
    let engine = engine(records);

    let outcome = engine.run(brisbane_click(), "CH4", &SectorChoice::All)?;
    match &outcome.effective {
        EffectiveQuery::Aggregate { sectors, limit } => {
            assert_eq!(*limit, 8);
            assert_eq!(sectors.len(), 8);
            let listed: Vec<String> = engine
                .list_sectors("CH4")?
                .into_iter()
                .skip(1)
                .take(8)
                .map(|choice| choice.code().to_string())
                .collect();
            assert_eq!(sectors, &listed);
        }
        other => panic!("expected aggregate, got {:?}", other),
    }
    // 10 + 9 + ... + 3
    assert_eq!(outcome.series.points()[0].emission, 52.0);
    Ok(())
}

#[test]
fn test_absent_sector_yields_empty_series() -> Result<()> {
    let engine = engine(vec![record(2020, "ENF", 10.0)]);

    let outcome = engine.run(brisbane_click(), "CH4", &SectorChoice::sector("WWT"))?;
    assert!(outcome.series.is_empty());
    assert_eq!(outcome.most_recent, None);
    Ok(())
}

#[test]
fn test_unknown_cell_yields_empty_series() -> Result<()> {
    let engine = engine(vec![record(2020, "ENF", 10.0)]);

    let outcome = engine.run(QueryPoint::new(51.5072, -0.1276), "CH4", &SectorChoice::All)?;
    assert_eq!(outcome.cell, GridCell::new(51.55, -0.15));
    assert!(outcome.series.is_empty());
    Ok(())
}

#[test]
fn test_list_sectors_orders_by_total() -> Result<()> {
    let engine = engine(vec![
        record(2020, "IND", 5.0),
        record(2020, "ENF", 10.0),
        record(2020, "AGS", 5.0),
        record(2020, "WWT", 0.0),
        record(2020, "TOTALS", 20.0),
    ]);

    let codes: Vec<String> = engine
        .list_sectors("CH4")?
        .iter()
        .map(|choice| choice.code().to_string())
        .collect();
    assert_eq!(codes, vec!["ALL", "ENF", "AGS", "IND"]);
    Ok(())
}

#[test]
fn test_rerun_for_cell_after_sector_change() -> Result<()> {
    let engine = engine(vec![record(2020, "ENF", 10.0), record(2020, "IND", 5.0)]);

    let first = engine.run(brisbane_click(), "CH4", &SectorChoice::sector("ENF"))?;
    let second = engine.run_for_cell(first.cell, "CH4", &SectorChoice::sector("IND"))?;
    assert_eq!(second.cell, first.cell);
    assert_eq!(second.point, None);
    assert_eq!(second.series.points()[0].emission, 5.0);
    Ok(())
}

#[test]
fn test_resolution_is_idempotent() -> Result<()> {
    let engine = engine(vec![record(2020, "ENF", 1.0)]);

    for &(lat, lon) in &[(-27.4698, 153.0251), (0.0, 0.0), (-0.049, 0.051), (89.99, -179.99), (12.3456, 45.6789)] {
        let first = engine.resolve_cell(QueryPoint::new(lat, lon))?;
        let second = engine.resolve_cell(first.as_point())?;
        assert_eq!(first, second);
    }
    Ok(())
}

#[test]
fn test_invalid_input_fails_fast() {
    let engine = engine(vec![record(2020, "ENF", 1.0)]);

    let err = engine
        .run(QueryPoint::new(-95.0, 153.0), "CH4", &SectorChoice::All)
        .unwrap_err();
    assert!(matches!(err, EmissionsError::InvalidPoint { .. }));

    let err = engine
        .run(brisbane_click(), "  ", &SectorChoice::All)
        .unwrap_err();
    assert!(matches!(err, EmissionsError::ValidationError { .. }));
}

#[test]
fn test_outcome_serializes_to_json() -> Result<()> {
    let engine = engine(vec![record(2020, "ENF", 10.0), record(2020, "TOTALS", 12.0)]);
    let outcome = engine.run(brisbane_click(), "CH4", &SectorChoice::All)?;

    let json = serde_json::to_value(&outcome)?;
    assert_eq!(json["cell"]["lat"], -27.45);
    assert_eq!(json["strategy"], "arithmetic");
    assert_eq!(json["effective"]["mode"], "SINGLE");
    assert_eq!(json["series"][0]["emission"], 12.0);
    Ok(())
}

#[tokio::test]
async fn test_export_written_and_read_back() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let engine = engine(vec![
        record(2020, "TOTALS", 20.5),
        record(2021, "TOTALS", 21.25),
    ]);
    let outcome = engine.run(brisbane_click(), "CH4", &SectorChoice::All)?;
    let artifact = engine.export(&outcome)?;
    assert_eq!(artifact.filename, "CH4_TOTALS_-27.45_153.05.csv");

    let storage = LocalStorage::new(output_path.clone());
    let written = storage.write_file(&artifact.filename, &artifact.bytes).await?;
    assert!(written.ends_with("CH4_TOTALS_-27.45_153.05.csv"));
    assert!(temp_dir.path().join(&artifact.filename).exists());

    let bytes = storage.read_file(&artifact.filename).await?;
    assert_eq!(parse_csv(&bytes)?, outcome.series);
    Ok(())
}
