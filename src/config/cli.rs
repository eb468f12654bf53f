use crate::config::toml_config::TomlConfig;
use crate::core::StrategyPreference;
use crate::domain::model::{QueryPoint, SectorChoice};
use crate::utils::error::{EmissionsError, Result};
use crate::utils::validation::{validate_required_field, Validate};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "grid-emissions")]
#[command(about = "Snap a point to the 0.1° emissions grid and print its time series")]
pub struct CliConfig {
    /// Emissions store (.csv, .db, .sqlite)
    #[arg(long)]
    pub store: Option<String>,

    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<String>,

    /// Latitude in WGS84 degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude in WGS84 degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Substance code, e.g. CH4, CO2, CO2bio, N2O
    #[arg(long)]
    pub substance: Option<String>,

    /// Sector code, or ALL
    #[arg(long)]
    pub sector: Option<String>,

    #[arg(long, value_enum)]
    pub strategy: Option<StrategyPreference>,

    /// Half-width of the nearest-cell search window in degrees
    #[arg(long)]
    pub search_window_deg: Option<f64>,

    /// Sectors summed for ALL when the cell has no TOTALS row
    #[arg(long)]
    pub dominant_limit: Option<usize>,

    /// Write the series as CSV under the output path
    #[arg(long)]
    pub export: bool,

    #[arg(long)]
    pub output_path: Option<String>,

    /// Decimal places for exported emission values
    #[arg(long)]
    pub precision: Option<usize>,

    /// List sectors with emissions for the substance and exit
    #[arg(long)]
    pub list_sectors: bool,

    /// Print the query outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// File settings (when given) with command-line overrides applied.
    pub fn settings(&self) -> Result<TomlConfig> {
        let mut settings = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(store) = &self.store {
            settings.store.path = Some(store.clone());
        }
        if let Some(strategy) = self.strategy {
            tracing::info!("🔧 Resolution strategy overridden to: {:?}", strategy);
            settings.resolution.strategy = strategy;
        }
        if let Some(window) = self.search_window_deg {
            settings.resolution.search_window_deg = Some(window);
        }
        if let Some(limit) = self.dominant_limit {
            settings.sectors.dominant_limit = Some(limit);
        }
        if let Some(output_path) = &self.output_path {
            settings.export.output_path = Some(output_path.clone());
        }
        if let Some(precision) = self.precision {
            settings.export.precision = Some(precision);
        }
        if let Some(substance) = &self.substance {
            settings.query.substance = Some(substance.clone());
        }
        if let Some(sector) = &self.sector {
            settings.query.sector = Some(sector.clone());
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn query_point(&self) -> Result<QueryPoint> {
        let lat = validate_required_field("lat", &self.lat)?;
        let lon = validate_required_field("lon", &self.lon)?;
        Ok(QueryPoint::new(*lat, *lon))
    }

    pub fn sector_choice(settings: &TomlConfig) -> SectorChoice {
        settings.sector().parse().unwrap_or(SectorChoice::All)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if !self.list_sectors && (self.lat.is_none() || self.lon.is_none()) {
            return Err(EmissionsError::MissingConfigError {
                field: "lat/lon".to_string(),
            });
        }
        Ok(())
    }
}
