//! Application configuration
//!
//! Resolution order: built-in defaults, an optional TOML file, the
//! `SALESFORGE_DATA_DIR` environment variable, then command-line flags
//! (applied by the binary).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::clusters::{default_labels, ClusterInterpretation};
use crate::error::ConfigError;

pub const DATA_DIR_ENV: &str = "SALESFORGE_DATA_DIR";

const DEFAULT_TRANSACTIONS: &str = "Superstore.csv";
const DEFAULT_FORECAST: &str = "forecast_sales.csv";
const DEFAULT_CLUSTERS: &str = "clustered_data.csv";
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub transactions: PathBuf,
    pub forecast: PathBuf,
    pub clusters: PathBuf,
    /// Rows shown by the compact forecast table
    pub forecast_tail: usize,
    pub cluster_labels: BTreeMap<i64, String>,
}

/// On-disk shape; every field is optional so partial files work.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    data: Option<DataSection>,
    forecast_tail: Option<usize>,
    /// TOML keys are strings, so ids arrive as "0", "1", ...
    cluster_labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DataSection {
    transactions: Option<PathBuf>,
    forecast: Option<PathBuf>,
    clusters: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::rooted_at(Path::new(DEFAULT_DATA_DIR))
    }
}

impl AppConfig {
    fn rooted_at(dir: &Path) -> Self {
        Self {
            transactions: dir.join(DEFAULT_TRANSACTIONS),
            forecast: dir.join(DEFAULT_FORECAST),
            clusters: dir.join(DEFAULT_CLUSTERS),
            forecast_tail: 5,
            cluster_labels: default_labels(),
        }
    }

    /// Build the configuration from defaults, an optional file and the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let data_dir = env::var(DATA_DIR_ENV).ok().map(PathBuf::from);
        let mut config = match &data_dir {
            Some(dir) => Self::rooted_at(dir),
            None => Self::default(),
        };

        if let Some(path) = path {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
            config.apply_toml(&text).map_err(|err| match err {
                ApplyError::Toml(source) => ConfigError::Invalid {
                    path: path.to_path_buf(),
                    source,
                },
                ApplyError::Config(err) => err,
            })?;
            log::debug!("applied config file {}", path.display());
        }

        Ok(config)
    }

    /// Overlay the settings present in a TOML document.
    ///
    /// Relative data paths in the document are resolved against
    /// `SALESFORGE_DATA_DIR` when it is set.
    fn apply_toml(&mut self, text: &str) -> Result<(), ApplyError> {
        let file: ConfigFile = toml::from_str(text).map_err(ApplyError::Toml)?;
        let data_dir = env::var(DATA_DIR_ENV).ok().map(PathBuf::from);
        let resolve = |p: PathBuf| match &data_dir {
            Some(dir) if p.is_relative() => dir.join(p),
            _ => p,
        };

        if let Some(data) = file.data {
            if let Some(p) = data.transactions {
                self.transactions = resolve(p);
            }
            if let Some(p) = data.forecast {
                self.forecast = resolve(p);
            }
            if let Some(p) = data.clusters {
                self.clusters = resolve(p);
            }
        }
        if let Some(n) = file.forecast_tail {
            self.forecast_tail = n;
        }
        if let Some(labels) = file.cluster_labels {
            self.cluster_labels = parse_labels(labels).map_err(ApplyError::Config)?;
        }

        Ok(())
    }

    pub fn interpretation(&self) -> ClusterInterpretation {
        ClusterInterpretation::new(self.cluster_labels.clone())
    }
}

#[derive(Debug)]
enum ApplyError {
    Toml(toml::de::Error),
    Config(ConfigError),
}

fn parse_labels(labels: BTreeMap<String, String>) -> Result<BTreeMap<i64, String>, ConfigError> {
    labels
        .into_iter()
        .map(|(key, label)| {
            key.trim()
                .parse::<i64>()
                .map(|id| (id, label))
                .map_err(|_| ConfigError::BadClusterKey(key))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.transactions, Path::new("data/Superstore.csv"));
        assert_eq!(config.forecast, Path::new("data/forecast_sales.csv"));
        assert_eq!(config.clusters, Path::new("data/clustered_data.csv"));
        assert_eq!(config.forecast_tail, 5);
        assert_eq!(config.cluster_labels.len(), 4);
        assert_eq!(config.interpretation().label(1), Some("VIPs - High Value Clients"));
    }

    #[test]
    fn test_apply_toml_overrides() {
        let mut config = AppConfig::default();
        let text = r#"
            forecast_tail = 3

            [data]
            forecast = "/srv/artifacts/forecast.csv"

            [cluster_labels]
            "0" = "Casual"
            "5" = "Wholesale"
        "#;

        config.apply_toml(text).unwrap();
        assert_eq!(config.forecast_tail, 3);
        assert_eq!(config.forecast, Path::new("/srv/artifacts/forecast.csv"));
        assert_eq!(config.transactions, Path::new("data/Superstore.csv"));

        let interpretation = config.interpretation();
        assert_eq!(interpretation.len(), 2);
        assert_eq!(interpretation.label(5), Some("Wholesale"));
        assert_eq!(interpretation.label(1), None);
    }

    #[test]
    fn test_bad_cluster_key() {
        let mut config = AppConfig::default();
        let result = config.apply_toml("[cluster_labels]\nvip = \"VIP\"\n");
        assert!(matches!(result, Err(ApplyError::Config(ConfigError::BadClusterKey(_)))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut config = AppConfig::default();
        assert!(matches!(config.apply_toml("colour = \"red\"\n"), Err(ApplyError::Toml(_))));
    }

    #[test]
    fn test_missing_config_file() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/salesforge.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }
}
