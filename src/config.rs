use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// One fund constituent export: where to fetch it and the local file name.
/// The file's stem doubles as the fund's matching key against the portfolio.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FundSource {
    pub url: String,
    pub file: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
        }
    }
}

fn default_stock_suffixes() -> Vec<String> {
    vec![".DE".to_string()]
}

fn default_crypto_suffixes() -> Vec<String> {
    vec!["-EUR".to_string()]
}

fn default_skip_rows() -> usize {
    2
}

fn default_max_age_days() -> u64 {
    30
}

fn default_chart_top_n() -> usize {
    100
}

/// Explicit run configuration; every knob the pipeline needs is a named
/// field here, nothing is read from the environment.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Portfolio CSV with the holdings to analyze.
    pub portfolio_file: PathBuf,
    /// Directory holding downloaded fund constituent files.
    pub fund_dir: PathBuf,
    /// Fund exports to keep refreshed.
    #[serde(default)]
    pub funds: Vec<FundSource>,
    /// Directory receiving the report sheets.
    pub report_dir: PathBuf,
    /// Directory receiving the chart artifacts.
    pub charts_dir: PathBuf,
    /// Exchange suffixes tried when pricing equities and funds.
    #[serde(default = "default_stock_suffixes")]
    pub stock_suffixes: Vec<String>,
    /// Currency-pair suffixes tried when pricing crypto.
    #[serde(default = "default_crypto_suffixes")]
    pub crypto_suffixes: Vec<String>,
    /// Metadata lines before the header row in fund exports.
    #[serde(default = "default_skip_rows")]
    pub fund_skip_rows: usize,
    /// Fund files younger than this are not re-downloaded.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
    /// Number of securities on the top-securities chart.
    #[serde(default = "default_chart_top_n")]
    pub chart_top_n: usize,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "depotlens")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
