//! CSV serialization of a resolved series. No I/O happens here; the caller
//! decides where the returned bytes go.

use crate::domain::model::{GridCell, ResolvedSeries, SeriesPoint};
use crate::utils::error::{EmissionsError, Result};

/// Minimum number of decimals written per emission value.
pub const DEFAULT_EXPORT_PRECISION: usize = 6;

const HEADER: [&str; 2] = ["year", "emission"];

/// Identifies what an exported series is.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMeta {
    pub substance: String,
    pub sector: String,
    pub cell: GridCell,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSeriesExporter {
    precision: usize,
}

impl Default for TimeSeriesExporter {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORT_PRECISION)
    }
}

impl TimeSeriesExporter {
    pub fn new(precision: usize) -> Self {
        Self { precision }
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    pub fn export(&self, series: &ResolvedSeries, meta: &ExportMeta) -> Result<ExportArtifact> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(HEADER)?;
        let mut widened = 0usize;
        for point in series.iter() {
            let (value, exact) = self.format_emission(point.emission);
            if !exact {
                widened += 1;
            }
            writer.write_record([point.year.to_string(), value])?;
        }

        let bytes = writer.into_inner().map_err(|e| EmissionsError::IoError(e.into_error()))?;
        let filename = export_filename(meta);
        if widened > 0 {
            tracing::warn!(
                "⚠️ {} value(s) in {} need more than {} decimals; written at full precision",
                widened,
                filename,
                self.precision
            );
        }
        tracing::debug!("Serialized {} rows for {}", series.len(), filename);

        Ok(ExportArtifact { filename, bytes })
    }

    /// Fixed-point text for `value`, widened to the shortest exact decimal
    /// when `precision` digits would not parse back to the same double.
    /// The flag is false when widening happened.
    fn format_emission(&self, value: f64) -> (String, bool) {
        let fixed = format!("{:.*}", self.precision, value);
        if fixed.parse::<f64>().is_ok_and(|parsed| parsed == value) {
            return (fixed, true);
        }
        // f64 Display never switches to exponent notation
        (value.to_string(), false)
    }
}

/// `<substance>_<sector>_<lat>_<lon>.csv` with coordinates at lattice precision.
pub fn export_filename(meta: &ExportMeta) -> String {
    format!(
        "{}_{}_{:.2}_{:.2}.csv",
        filename_safe(&meta.substance),
        filename_safe(&meta.sector),
        meta.cell.lat,
        meta.cell.lon
    )
}

fn filename_safe(value: &str) -> String {
    value.replace([' ', '/'], "_")
}

/// Reads a body written by [`TimeSeriesExporter::export`].
pub fn parse_csv(bytes: &[u8]) -> Result<ResolvedSeries> {
    let mut reader = csv::Reader::from_reader(bytes);
    {
        let headers = reader.headers()?;
        if headers.iter().ne(HEADER) {
            return Err(EmissionsError::ValidationError {
                message: format!("unexpected CSV header: {:?}", headers),
            });
        }
    }

    let mut points = Vec::new();
    for row in reader.deserialize::<SeriesPoint>() {
        points.push(row?);
    }
    Ok(ResolvedSeries::new(points))
}
