use crate::core::export::DEFAULT_EXPORT_PRECISION;
use crate::core::grid::DEFAULT_SEARCH_WINDOW_DEG;
use crate::core::sectors::DEFAULT_DOMINANT_SECTOR_LIMIT;
use crate::core::{ConfigProvider, StrategyPreference};
use crate::utils::error::{EmissionsError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_OUTPUT_PATH: &str = "./output";
pub const DEFAULT_SUBSTANCE: &str = "CH4";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub store: StoreConfig,
    pub resolution: ResolutionConfig,
    pub sectors: SectorsConfig,
    pub export: ExportConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    pub strategy: StrategyPreference,
    pub search_window_deg: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectorsConfig {
    pub dominant_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_path: Option<String>,
    pub precision: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub substance: Option<String>,
    pub sector: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EmissionsError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EmissionsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${EMISSIONS_DB})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static env pattern"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        let store_path = validation::validate_required_field("store.path", &self.store.path)?;
        validation::validate_path("store.path", store_path)?;
        validation::validate_file_extension(
            "store.path",
            store_path,
            crate::adapters::STORE_EXTENSIONS,
        )?;

        validation::validate_range(
            "resolution.search_window_deg",
            self.search_window_deg(),
            0.05,
            1.0,
        )?;
        validation::validate_positive_number("sectors.dominant_limit", self.dominant_sector_limit(), 1)?;
        validation::validate_range("export.precision", self.export_precision(), 0, 17)?;
        validation::validate_path("export.output_path", self.output_path())?;
        validation::validate_non_empty_string("query.substance", self.substance())?;

        Ok(())
    }

    pub fn substance(&self) -> &str {
        self.query.substance.as_deref().unwrap_or(DEFAULT_SUBSTANCE)
    }

    /// "ALL" unless a sector is configured.
    pub fn sector(&self) -> &str {
        self.query
            .sector
            .as_deref()
            .unwrap_or(crate::domain::model::ALL_SECTORS)
    }
}

impl ConfigProvider for TomlConfig {
    fn store_path(&self) -> &str {
        self.store.path.as_deref().unwrap_or("")
    }

    fn strategy_preference(&self) -> StrategyPreference {
        self.resolution.strategy
    }

    fn search_window_deg(&self) -> f64 {
        self.resolution
            .search_window_deg
            .unwrap_or(DEFAULT_SEARCH_WINDOW_DEG)
    }

    fn dominant_sector_limit(&self) -> usize {
        self.sectors
            .dominant_limit
            .unwrap_or(DEFAULT_DOMINANT_SECTOR_LIMIT)
    }

    fn output_path(&self) -> &str {
        self.export.output_path.as_deref().unwrap_or(DEFAULT_OUTPUT_PATH)
    }

    fn export_precision(&self) -> usize {
        self.export.precision.unwrap_or(DEFAULT_EXPORT_PRECISION)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
