use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use url::Url;

use crate::geo_lookup::{DatasetBounds, GeoLookupError, GeoLookupService, PolygonStore, ResolverKind};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub dataset: DatasetConfig,
    pub explanation: ExplanationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
    /// Overrides the extent computed from the geometries
    pub bounds: Option<DatasetBounds>,
    pub resolver: ResolverKind,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/landiq_soil_data.geojson"),
            bounds: None,
            resolver: ResolverKind::Linear,
        }
    }
}

impl DatasetConfig {
    /// Load the polygon store and build a lookup service over it
    pub fn open(&self) -> Result<GeoLookupService, GeoLookupError> {
        let mut store = PolygonStore::load(&self.path)?;
        if let Some(bounds) = self.bounds {
            info!("Using configured dataset bounds {:?}", bounds);
            store = store.with_bounds(bounds);
        }
        Ok(GeoLookupService::with_resolver(Arc::new(store), self.resolver))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExplanationConfig {
    pub enabled: bool,
    pub api_url: Option<Url>,
    pub model_name: String,
    /// Name of the environment variable holding the API token
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: None,
            model_name: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            api_key_env: "HF_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ExplanationConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load the file if given and present, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None if Path::new("landiq.toml").exists() => Self::load_from_file("landiq.toml"),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [server]
            listen = "127.0.0.1:8080"

            [dataset]
            path = "/srv/soil.geojson.gz"
            resolver = "rtree"

            [dataset.bounds]
            min_lon = 2.0
            min_lat = 4.0
            max_lon = 15.0
            max_lat = 14.0

            [explanation]
            enabled = true
            api_url = "https://api-inference.huggingface.co/models/test"
            model_name = "test-model"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.dataset.path, PathBuf::from("/srv/soil.geojson.gz"));
        assert_eq!(config.dataset.resolver, ResolverKind::Rtree);
        assert_eq!(config.dataset.bounds.unwrap().max_lat, 14.0);
        assert!(config.explanation.enabled);
        assert_eq!(config.explanation.model_name, "test-model");
        assert_eq!(config.explanation.api_key_env, "HF_API_KEY");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:5000");
        assert_eq!(config.dataset.resolver, ResolverKind::Linear);
        assert!(config.dataset.bounds.is_none());
        assert!(!config.explanation.enabled);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            [explanation]
            api_url = "not a url"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_open_dataset_with_bounds_override() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            crate::geo_lookup::fixtures::sample_collection()
        )
        .unwrap();

        let dataset = DatasetConfig {
            path: file.path().to_path_buf(),
            bounds: Some(DatasetBounds::NIGERIA),
            resolver: ResolverKind::Rtree,
        };
        let service = dataset.open().unwrap();
        assert_eq!(service.bounds(), DatasetBounds::NIGERIA);
        assert_eq!(service.store().len(), 4);
    }

    #[test]
    fn test_open_missing_dataset() {
        let dataset = DatasetConfig {
            path: PathBuf::from("/nonexistent/soil.geojson"),
            ..Default::default()
        };
        assert!(matches!(
            dataset.open(),
            Err(GeoLookupError::DataLoad { .. })
        ));
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(Config::load_from_file("/nonexistent/landiq.toml").is_err());
    }
}
