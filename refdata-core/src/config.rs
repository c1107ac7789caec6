use crate::error::{RefDataError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime configuration for the loader and the query API.
///
/// Loaded from `refdata.toml`, with a couple of environment overrides
/// (`REFDATA_DB_PATH`, `REFDATA_API_BIND`) for deployment. Passed
/// explicitly to pipeline and loader constructors; there is no global
/// connection state.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub etl: EtlConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EtlConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,
    #[serde(default = "default_report_top_n")]
    pub report_top_n: usize,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_payload_bytes: default_max_payload_bytes(),
            report_top_n: default_report_top_n(),
        }
    }
}

/// One entry per entity source. Each may point at a remote endpoint,
/// a local file, or both (the file acts as an offline fallback).
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    pub funds: SourceConfig,
    pub bonds: SourceConfig,
    pub issuers: SourceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub url: Option<String>,
    pub file: Option<PathBuf>,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_batch_size() -> usize {
    500
}

fn default_max_payload_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_report_top_n() -> usize {
    10
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RefDataError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let mut config: AppConfig = toml::from_str(&content)?;

        if let Ok(db_path) = std::env::var("REFDATA_DB_PATH") {
            config.database.path = PathBuf::from(db_path);
        }
        if let Ok(bind) = std::env::var("REFDATA_API_BIND") {
            config.api.bind = bind;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let toml = r#"
            [database]
            path = "data/refdata.db"

            [sources.funds]
            file = "fixtures/cad_fi.csv"

            [sources.bonds]
            url = "https://example.com/precos.csv"

            [sources.issuers]
            file = "fixtures/issuers.json"
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.etl.batch_size, 500);
        assert_eq!(config.api.bind, "0.0.0.0:3000");
        assert!(config.sources.funds.url.is_none());
        assert_eq!(
            config.sources.bonds.url.as_deref(),
            Some("https://example.com/precos.csv")
        );
    }
}
