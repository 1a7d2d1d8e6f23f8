use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub const CONFIG_PATH: &str = "config.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub vectorizer_path: PathBuf,
    pub classifier_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            vectorizer_path: PathBuf::from("count_vectorizer.json"),
            classifier_path: PathBuf::from("basic_classifier.onnx"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub url: String,
    pub num_calls: usize,
    pub results_csv: PathBuf,
    pub plot_path: PathBuf,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            url: "http://127.0.0.1:5000/predict".to_string(),
            num_calls: 100,
            results_csv: PathBuf::from("api_test_results.csv"),
            plot_path: PathBuf::from("latency_boxplot.svg"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub benchmark: BenchmarkConfig,
}

/// Loads `config.yaml` from the working directory. Both binaries run without
/// one, so a missing or broken file only produces a warning.
pub fn load_config() -> Config {
    load_config_from(Path::new(CONFIG_PATH))
}

pub fn load_config_from(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(config_content) => match serde_yaml::from_str::<Config>(&config_content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                Config::default()
            }
        },
        Err(_) => {
            warn!(path = %path.display(), "Config not found, using defaults");
            Config::default()
        }
    }
}

/// Installs the fmt subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.yaml"));
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.vectorizer_path, PathBuf::from("count_vectorizer.json"));
        assert_eq!(config.benchmark.num_calls, 100);
        assert_eq!(config.benchmark.url, "http://127.0.0.1:5000/predict");
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  port: 8080\nbenchmark:\n  num_calls: 5\n").unwrap();

        let config = load_config_from(&path);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.benchmark.num_calls, 5);
        assert_eq!(config.benchmark.results_csv, PathBuf::from("api_test_results.csv"));
    }

    #[test]
    fn test_unparsable_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server: [not, a, map").unwrap();
        assert_eq!(load_config_from(&path).server.port, 5000);
    }
}
