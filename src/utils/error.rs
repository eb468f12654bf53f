use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmissionsError {
    #[error("Invalid query point ({lat}, {lon}): {reason}")]
    InvalidPoint { lat: f64, lon: f64, reason: String },

    #[error("Capability not available: {capability}")]
    NoCapability { capability: String },

    #[error("Emissions store unavailable ({location}): {message}")]
    StoreUnavailable { location: String, message: String },

    #[cfg(feature = "sqlite")]
    #[error("Store query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Capability,
    Store,
    Io,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EmissionsError {
    pub fn store_unavailable(location: impl Into<String>, message: impl ToString) -> Self {
        Self::StoreUnavailable {
            location: location.into(),
            message: message.to_string(),
        }
    }

    pub fn no_capability(capability: impl Into<String>) -> Self {
        Self::NoCapability {
            capability: capability.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidPoint { .. } | Self::ValidationError { .. } => ErrorCategory::Input,
            Self::NoCapability { .. } => ErrorCategory::Capability,
            Self::StoreUnavailable { .. } | Self::CsvError(_) => ErrorCategory::Store,
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => ErrorCategory::Store,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::Io,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // recovered by falling back to the arithmetic strategy
            ErrorCategory::Capability => ErrorSeverity::Low,
            ErrorCategory::Input => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Io => ErrorSeverity::High,
            ErrorCategory::Store => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::InvalidPoint { .. } => {
                "Use WGS84 degrees: latitude in [-90, 90], longitude in [-180, 180]"
            }
            Self::NoCapability { .. } => {
                "Load the spatial extension or use --strategy arithmetic"
            }
            Self::StoreUnavailable { .. } => {
                "Check that the store path exists and is a readable emissions database"
            }
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => "Check that the store has an 'emissions' table with the expected columns",
            Self::CsvError(_) => {
                "Check the CSV header: lat,lon,year,substance,sector,emission[,location]"
            }
            Self::IoError(_) => "Check file permissions and available disk space",
            Self::SerializationError(_) => "Re-run without --json to inspect the raw result",
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Review the configuration file and CLI flags",
            Self::ValidationError { .. } => "Check the substance and sector arguments",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::InvalidPoint { lat, lon, .. } => {
                format!("The point ({}, {}) is not a valid WGS84 coordinate", lat, lon)
            }
            Self::StoreUnavailable { location, .. } => {
                format!("Could not open the emissions store at {}", location)
            }
            Self::MissingConfigError { field } => {
                format!("Missing required setting '{}'", field)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EmissionsError>;
