//! Read-only SQLite backend for the `emissions` table.
//!
//! No spatial extension is loaded, so this store keeps the port's default
//! `probe_spatial` and the resolver always snaps arithmetically against it.
//! The `location` column, when present, is ignored.

use crate::domain::model::{GridCell, ResolvedSeries, SeriesPoint};
use crate::domain::ports::EmissionsStore;
use crate::utils::error::{EmissionsError, Result};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

pub struct SqliteStore {
    conn: Connection,
    location: String,
}

impl SqliteStore {
    /// Opens `path` read-only and checks that the `emissions` table is there.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let location = path.display().to_string();

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| EmissionsError::store_unavailable(location.clone(), e))?;

        Self::from_connection(conn, location)
    }

    pub fn from_connection(conn: Connection, location: String) -> Result<Self> {
        let table: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'emissions'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| EmissionsError::store_unavailable(location.clone(), e))?;

        if table.is_none() {
            return Err(EmissionsError::store_unavailable(
                location,
                "no 'emissions' table",
            ));
        }

        tracing::debug!("Opened emissions store {}", location);
        Ok(Self { conn, location })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    fn query_series(&self, sql: &str, values: Vec<Value>) -> Result<ResolvedSeries> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok(SeriesPoint {
                year: row.get(0)?,
                emission: row.get(1)?,
            })
        })?;

        let mut points = Vec::new();
        for point in rows {
            points.push(point?);
        }
        Ok(ResolvedSeries::new(points))
    }
}

impl EmissionsStore for SqliteStore {
    fn series_for(&self, cell: &GridCell, substance: &str, sector: &str) -> Result<ResolvedSeries> {
        let sql = "SELECT year, SUM(emission) AS emission
                   FROM emissions
                   WHERE lat = ?1 AND lon = ?2 AND substance = ?3 AND sector = ?4
                     AND emission IS NOT NULL
                   GROUP BY year
                   ORDER BY year";
        self.query_series(
            sql,
            vec![
                Value::Real(cell.lat),
                Value::Real(cell.lon),
                Value::Text(substance.to_string()),
                Value::Text(sector.to_string()),
            ],
        )
    }

    fn aggregate_series_for(
        &self,
        cell: &GridCell,
        substance: &str,
        sectors: &[String],
    ) -> Result<ResolvedSeries> {
        if sectors.is_empty() {
            return Ok(ResolvedSeries::empty());
        }

        let placeholders = vec!["?"; sectors.len()].join(",");
        let sql = format!(
            "SELECT year, SUM(emission) AS emission
             FROM emissions
             WHERE lat = ? AND lon = ? AND substance = ? AND sector IN ({})
               AND emission IS NOT NULL
             GROUP BY year
             ORDER BY year",
            placeholders
        );

        let mut values = vec![
            Value::Real(cell.lat),
            Value::Real(cell.lon),
            Value::Text(substance.to_string()),
        ];
        values.extend(sectors.iter().map(|s| Value::Text(s.clone())));
        self.query_series(&sql, values)
    }

    fn sector_totals(&self, substance: &str) -> Result<BTreeMap<String, f64>> {
        let mut stmt = self.conn.prepare(
            "SELECT sector, SUM(emission) FROM emissions WHERE substance = ?1 GROUP BY sector",
        )?;
        let rows = stmt.query_map(params![substance], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<f64>>(1)?))
        })?;

        let mut totals = BTreeMap::new();
        for row in rows {
            // NULL when every emission of the sector is NULL
            if let (sector, Some(total)) = row? {
                totals.insert(sector, total);
            }
        }
        Ok(totals)
    }

    fn has_sector(&self, cell: &GridCell, substance: &str, sector: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM emissions
                 WHERE lat = ?1 AND lon = ?2 AND substance = ?3 AND sector = ?4
                 LIMIT 1",
                params![cell.lat, cell.lon, substance, sector],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn cell_exists(&self, cell: &GridCell) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM emissions WHERE lat = ?1 AND lon = ?2 LIMIT 1",
                params![cell.lat, cell.lon],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}
