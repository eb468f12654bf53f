//! Columnar in-memory emissions store.
//!
//! Rows are kept as parallel column vectors, with two indexes built on
//! insertion: exact cell keys for point lookups, and 0.1° buckets of the
//! stored geometry so window queries only visit nearby rows.

use crate::domain::model::{
    BoundingWindow, CellCandidate, EmissionRecord, GeoPoint, GridCell, ResolvedSeries, SeriesPoint,
};
use crate::domain::ports::{EmissionsStore, SPATIAL_CAPABILITY};
use crate::utils::error::{EmissionsError, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;

const BUCKET_DEG: f64 = 0.1;

type CellKey = (u64, u64);

fn cell_key(cell: &GridCell) -> CellKey {
    (cell.lat.to_bits(), cell.lon.to_bits())
}

fn bucket(lat: f64, lon: f64) -> (i64, i64) {
    ((lat / BUCKET_DEG).floor() as i64, (lon / BUCKET_DEG).floor() as i64)
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    lat: f64,
    lon: f64,
    year: i32,
    substance: String,
    sector: String,
    emission: f64,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    lat: Vec<f64>,
    lon: Vec<f64>,
    year: Vec<i32>,
    substance: Vec<String>,
    sector: Vec<String>,
    emission: Vec<f64>,
    location: Vec<Option<GeoPoint>>,
    by_cell: HashMap<CellKey, Vec<usize>>,
    by_bucket: HashMap<(i64, i64), Vec<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I: IntoIterator<Item = EmissionRecord>>(records: I) -> Self {
        let mut store = Self::new();
        for record in records {
            store.push(record);
        }
        store
    }

    /// Loads `lat,lon,year,substance,sector,emission[,location]` rows.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| EmissionsError::store_unavailable(path.display().to_string(), e))?;
        let store = Self::from_csv_reader(file)?;
        tracing::info!("Loaded {} emission rows from {}", store.len(), path.display());
        Ok(store)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut store = Self::new();

        for (line, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
            let row = row?;
            let location = match row.location.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(wkt) => Some(parse_wkt_point(wkt).ok_or_else(|| EmissionsError::ValidationError {
                    message: format!("row {}: invalid location '{}'", line + 1, wkt),
                })?),
            };

            let record = EmissionRecord {
                cell: GridCell::new(row.lat, row.lon),
                year: row.year,
                substance: row.substance,
                sector: row.sector,
                emission: row.emission,
                location,
            };
            store.push(record);
        }

        Ok(store)
    }

    pub fn push(&mut self, record: EmissionRecord) {
        let index = self.lat.len();

        self.by_cell.entry(cell_key(&record.cell)).or_default().push(index);
        if let Some(location) = record.location {
            self.by_bucket
                .entry(bucket(location.lat, location.lon))
                .or_default()
                .push(index);
        }

        self.lat.push(record.cell.lat);
        self.lon.push(record.cell.lon);
        self.year.push(record.year);
        self.substance.push(record.substance);
        self.sector.push(record.sector);
        self.emission.push(record.emission);
        self.location.push(record.location);
    }

    pub fn len(&self) -> usize {
        self.lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    fn rows_at<'a>(&'a self, cell: &GridCell, substance: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.by_cell
            .get(&cell_key(cell))
            .map(|rows| rows.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
            .filter(move |&i| self.substance[i] == substance)
    }

    fn sum_by_year<I: Iterator<Item = usize>>(&self, rows: I) -> ResolvedSeries {
        let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
        for i in rows {
            *by_year.entry(self.year[i]).or_insert(0.0) += self.emission[i];
        }
        ResolvedSeries::new(
            by_year
                .into_iter()
                .map(|(year, emission)| SeriesPoint { year, emission })
                .collect(),
        )
    }
}

/// Parses WKT `POINT (lon lat)`.
pub fn parse_wkt_point(text: &str) -> Option<GeoPoint> {
    static POINT: OnceLock<Regex> = OnceLock::new();
    let re = POINT.get_or_init(|| {
        Regex::new(r"(?i)^\s*POINT\s*\(\s*([-+0-9.eE]+)\s+([-+0-9.eE]+)\s*\)\s*$")
            .expect("static WKT pattern")
    });

    let caps = re.captures(text)?;
    let lon: f64 = caps[1].parse().ok()?;
    let lat: f64 = caps[2].parse().ok()?;
    Some(GeoPoint { lat, lon })
}

impl EmissionsStore for MemoryStore {
    fn series_for(&self, cell: &GridCell, substance: &str, sector: &str) -> Result<ResolvedSeries> {
        Ok(self.sum_by_year(self.rows_at(cell, substance).filter(|&i| self.sector[i] == sector)))
    }

    fn aggregate_series_for(
        &self,
        cell: &GridCell,
        substance: &str,
        sectors: &[String],
    ) -> Result<ResolvedSeries> {
        Ok(self.sum_by_year(
            self.rows_at(cell, substance)
                .filter(|&i| sectors.iter().any(|s| *s == self.sector[i])),
        ))
    }

    fn sector_totals(&self, substance: &str) -> Result<BTreeMap<String, f64>> {
        let mut totals = BTreeMap::new();
        for i in 0..self.len() {
            if self.substance[i] == substance {
                *totals.entry(self.sector[i].clone()).or_insert(0.0) += self.emission[i];
            }
        }
        Ok(totals)
    }

    fn has_sector(&self, cell: &GridCell, substance: &str, sector: &str) -> Result<bool> {
        Ok(self.rows_at(cell, substance).any(|i| self.sector[i] == sector))
    }

    fn cell_exists(&self, cell: &GridCell) -> Result<bool> {
        Ok(self.by_cell.contains_key(&cell_key(cell)))
    }

    fn probe_spatial(&self) -> Result<()> {
        if self.by_bucket.is_empty() {
            Err(EmissionsError::no_capability(SPATIAL_CAPABILITY))
        } else {
            Ok(())
        }
    }

    fn cells_within(&self, window: &BoundingWindow) -> Result<Vec<CellCandidate>> {
        let (min_lat_bucket, min_lon_bucket) = bucket(window.min_lat, window.min_lon);
        let (max_lat_bucket, max_lon_bucket) = bucket(window.max_lat, window.max_lon);

        let mut candidates = Vec::new();
        for lat_bucket in min_lat_bucket..=max_lat_bucket {
            for lon_bucket in min_lon_bucket..=max_lon_bucket {
                let Some(rows) = self.by_bucket.get(&(lat_bucket, lon_bucket)) else {
                    continue;
                };
                for &i in rows {
                    if let Some(location) = self.location[i] {
                        if window.contains(location.lat, location.lon) {
                            candidates.push(CellCandidate {
                                cell: GridCell::new(self.lat[i], self.lon[i]),
                                location,
                            });
                        }
                    }
                }
            }
        }

        candidates.sort_by(|a, b| a.cell.lexicographic_cmp(&b.cell));
        candidates.dedup_by(|a, b| a.cell == b.cell);
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
lat,lon,year,substance,sector,emission,location
-27.45,153.05,2020,CH4,ENF,4.5,POINT (153.05 -27.45)
-27.45,153.05,2021,CH4,ENF,5.5,POINT (153.05 -27.45)
-27.45,153.05,2021,CH4,IND,2.0,POINT (153.05 -27.45)
-27.45,153.05,2021,CO2,ENE,100.0,POINT (153.05 -27.45)
-27.35,153.05,2020,CH4,ENF,1.0,
";

    #[test]
    fn test_load_csv_and_query_series() {
        let store = MemoryStore::from_csv_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(store.len(), 5);

        let cell = GridCell::new(-27.45, 153.05);
        let series = store.series_for(&cell, "CH4", "ENF").unwrap();
        assert_eq!(
            series.points(),
            &[
                SeriesPoint { year: 2020, emission: 4.5 },
                SeriesPoint { year: 2021, emission: 5.5 },
            ]
        );

        let sectors = vec!["ENF".to_string(), "IND".to_string()];
        let aggregate = store.aggregate_series_for(&cell, "CH4", &sectors).unwrap();
        assert_eq!(aggregate.points()[1], SeriesPoint { year: 2021, emission: 7.5 });

        assert!(store.aggregate_series_for(&cell, "CH4", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_sector_totals_span_all_cells() {
        let store = MemoryStore::from_csv_reader(SAMPLE.as_bytes()).unwrap();
        let totals = store.sector_totals("CH4").unwrap();
        assert_eq!(totals.get("ENF"), Some(&11.0));
        assert_eq!(totals.get("IND"), Some(&2.0));
        assert!(!totals.contains_key("ENE"));
    }

    #[test]
    fn test_window_query_uses_stored_geometry() {
        let store = MemoryStore::from_csv_reader(SAMPLE.as_bytes()).unwrap();
        assert!(store.probe_spatial().is_ok());

        let window = BoundingWindow::around(crate::domain::model::QueryPoint::new(-27.4, 153.0), 0.1);
        let candidates = store.cells_within(&window).unwrap();
        // rows at the northern cell carry no geometry
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].cell, GridCell::new(-27.45, 153.05));
    }

    #[test]
    fn test_no_geometry_means_no_capability() {
        let store = MemoryStore::from_records(vec![EmissionRecord::new(
            GridCell::new(0.05, 0.05),
            2020,
            "CH4",
            "ENF",
            1.0,
        )]);
        assert!(matches!(
            store.probe_spatial(),
            Err(EmissionsError::NoCapability { .. })
        ));
    }

    #[test]
    fn test_parse_wkt_point() {
        assert_eq!(
            parse_wkt_point("POINT (153.05 -27.45)"),
            Some(GeoPoint { lat: -27.45, lon: 153.05 })
        );
        assert_eq!(
            parse_wkt_point("point(1e-1 2.5)"),
            Some(GeoPoint { lat: 2.5, lon: 0.1 })
        );
        assert_eq!(parse_wkt_point("LINESTRING (0 0, 1 1)"), None);
    }

    #[test]
    fn test_bad_location_is_rejected() {
        let csv = "lat,lon,year,substance,sector,emission,location\n0.05,0.05,2020,CH4,ENF,1.0,nowhere\n";
        assert!(matches!(
            MemoryStore::from_csv_reader(csv.as_bytes()),
            Err(EmissionsError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_store_unavailable() {
        let err = MemoryStore::from_csv_path("/nonexistent/emissions.csv").unwrap_err();
        assert!(matches!(err, EmissionsError::StoreUnavailable { .. }));
    }
}
