use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved sector holding the inventory's own pre-computed total.
pub const TOTALS_SECTOR: &str = "TOTALS";

/// Wire form of the "all sectors" request.
pub const ALL_SECTORS: &str = "ALL";

/// Grid spacing in degrees.
pub const CELL_SIZE_DEG: f64 = 0.1;

/// Offset of cell centres from integer multiples of the spacing.
pub const CELL_CENTRE_OFFSET_DEG: f64 = 0.05;

/// A raw (lat, lon) in WGS84 degrees, as clicked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryPoint {
    pub lat: f64,
    pub lon: f64,
}

impl QueryPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Stored point geometry of a cell. May deviate from the cell key on irregular grids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Identity of a 0.1° x 0.1° cell: its centre coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub lat: f64,
    pub lon: f64,
}

impl GridCell {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn as_point(&self) -> QueryPoint {
        QueryPoint::new(self.lat, self.lon)
    }

    /// True when both axes sit on the 0.05-offset lattice.
    pub fn is_lattice_centre(&self) -> bool {
        is_lattice_value(self.lat) && is_lattice_value(self.lon)
    }

    /// Lexicographic (lat, lon) ordering used to break distance ties.
    pub fn lexicographic_cmp(&self, other: &GridCell) -> std::cmp::Ordering {
        self.lat
            .total_cmp(&other.lat)
            .then_with(|| self.lon.total_cmp(&other.lon))
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}, {:.2}", self.lat, self.lon)
    }
}

pub(crate) fn is_lattice_value(value: f64) -> bool {
    if !value.is_finite() {
        return false;
    }
    let hundredths = (value * 100.0).round();
    (value * 100.0 - hundredths).abs() < 1e-6 && (hundredths as i64).rem_euclid(10) == 5
}

/// One row of the external `emissions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub cell: GridCell,
    pub year: i32,
    pub substance: String,
    pub sector: String,
    pub emission: f64,
    pub location: Option<GeoPoint>,
}

impl EmissionRecord {
    pub fn new(cell: GridCell, year: i32, substance: &str, sector: &str, emission: f64) -> Self {
        Self {
            cell,
            year,
            substance: substance.to_string(),
            sector: sector.to_string(),
            emission,
            location: None,
        }
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub year: i32,
    pub emission: f64,
}

/// Year-ascending emissions for one (cell, substance, effective sector).
/// Missing years are absent, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedSeries {
    points: Vec<SeriesPoint>,
}

impl ResolvedSeries {
    pub fn new(mut points: Vec<SeriesPoint>) -> Self {
        points.sort_by_key(|p| p.year);
        Self { points }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn most_recent(&self) -> Option<SeriesPoint> {
        self.points.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter()
    }
}

/// The sector a caller asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectorChoice {
    All,
    Sector(String),
}

impl SectorChoice {
    pub fn sector(code: &str) -> Self {
        Self::Sector(code.to_string())
    }

    pub fn code(&self) -> &str {
        match self {
            Self::All => ALL_SECTORS,
            Self::Sector(code) => code,
        }
    }
}

impl FromStr for SectorChoice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_SECTORS) {
            Ok(Self::All)
        } else {
            Ok(Self::Sector(s.to_string()))
        }
    }
}

impl fmt::Display for SectorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// What the store is actually asked for once the sector choice is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectiveQuery {
    Single { sector: String },
    Aggregate { sectors: Vec<String>, limit: usize },
}

impl EffectiveQuery {
    /// Sector code used in labels and filenames; aggregates report as TOTALS.
    pub fn label(&self) -> &str {
        match self {
            Self::Single { sector } => sector,
            Self::Aggregate { .. } => TOTALS_SECTOR,
        }
    }
}

/// Axis-aligned search window in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingWindow {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingWindow {
    pub fn around(point: QueryPoint, half_width: f64) -> Self {
        Self {
            min_lat: point.lat - half_width,
            max_lat: point.lat + half_width,
            min_lon: point.lon - half_width,
            max_lon: point.lon + half_width,
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// A cell near the query point together with its stored geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellCandidate {
    pub cell: GridCell,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Distance,
    Arithmetic,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Distance => f.write_str("distance"),
            Self::Arithmetic => f.write_str("arithmetic"),
        }
    }
}

/// Everything a caller needs to display or export one click.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub point: Option<QueryPoint>,
    pub cell: GridCell,
    pub substance: String,
    pub strategy: StrategyKind,
    pub effective: EffectiveQuery,
    pub most_recent: Option<SeriesPoint>,
    pub series: ResolvedSeries,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_centres() {
        assert!(GridCell::new(-27.45, 153.05).is_lattice_centre());
        assert!(GridCell::new(0.05, -0.05).is_lattice_centre());
        assert!(!GridCell::new(-27.4698, 153.05).is_lattice_centre());
        assert!(!GridCell::new(10.0, 10.05).is_lattice_centre());
        assert!(!GridCell::new(f64::NAN, 0.05).is_lattice_centre());
    }

    #[test]
    fn test_sector_choice_parsing() {
        assert_eq!("ALL".parse::<SectorChoice>().unwrap(), SectorChoice::All);
        assert_eq!("all".parse::<SectorChoice>().unwrap(), SectorChoice::All);
        assert_eq!(" all ".parse::<SectorChoice>().unwrap(), SectorChoice::All);
        assert_eq!(" ENF ".parse::<SectorChoice>().unwrap(), SectorChoice::sector(" ENF "));
        assert_eq!("ENF".parse::<SectorChoice>().unwrap().code(), "ENF");
        assert_eq!(SectorChoice::sector("IND").to_string(), "IND");
    }

    #[test]
    fn test_series_sorted_and_most_recent() {
        let series = ResolvedSeries::new(vec![
            SeriesPoint { year: 2022, emission: 3.0 },
            SeriesPoint { year: 2020, emission: 1.0 },
        ]);
        assert_eq!(series.points()[0].year, 2020);
        assert_eq!(series.most_recent(), Some(SeriesPoint { year: 2022, emission: 3.0 }));
        assert_eq!(ResolvedSeries::empty().most_recent(), None);
    }

    #[test]
    fn test_effective_query_json_shape() {
        let single = EffectiveQuery::Single { sector: "TOTALS".to_string() };
        let json = serde_json::to_value(&single).unwrap();
        assert_eq!(json["mode"], "SINGLE");
        assert_eq!(json["sector"], "TOTALS");

        let aggregate = EffectiveQuery::Aggregate {
            sectors: vec!["ENF".to_string()],
            limit: 8,
        };
        assert_eq!(aggregate.label(), TOTALS_SECTOR);
        assert_eq!(serde_json::to_value(&aggregate).unwrap()["mode"], "AGGREGATE");
    }
}
