//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use sciharvest_pipeline::PipelineConfig;

/// Global configuration for sciharvest
///
/// Pipeline sections (`[rate_limit]`, `[resolver]`, ...) sit at the top level
/// next to `[output]`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_dir: PathBuf,
    pub compression_level: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from("./harvest"),
            compression_level: 3,
        }
    }
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./sciharvest.toml (current directory)
    /// 2. ~/.config/sciharvest/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("sciharvest.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "sciharvest") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default().with_env_credentials())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config.with_env_credentials())
    }

    /// Resolve `${VAR}` credential values; fall back to `S2_API_KEY`.
    fn with_env_credentials(mut self) -> Self {
        let creds = &mut self.pipeline.credentials;
        creds.semantic_scholar_api_key = creds
            .semantic_scholar_api_key
            .take()
            .and_then(|s| expand_env_var(&s))
            .or_else(|| std::env::var("S2_API_KEY").ok());
        creds.contact_email = creds.contact_email.take().and_then(|s| expand_env_var(&s));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sciharvest_pipeline::StopAfter;
    use sciharvest_pipeline::resolver::BackendKind;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output.default_dir, PathBuf::from("./harvest"));
        assert_eq!(config.output.compression_level, 3);
        assert_eq!(config.pipeline.worker_concurrency, 4);
        config.pipeline.validate().unwrap();
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${SCIHARVEST_NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn expand_env_var_from_environment() {
        // PATH is set in every test environment
        let path = std::env::var("PATH").unwrap();
        assert_eq!(expand_env_var("${PATH}"), Some(path));
    }

    #[test]
    fn empty_document_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.pipeline.rate_limit.max_requests_per_window, 10);
        assert_eq!(config.pipeline.stop_after, StopAfter::Extract);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
worker_concurrency = 8
stop_after = "download"

[output]
default_dir = "/tmp/harvest"
compression_level = 5

[rate_limit]
max_requests_per_window = 3
window_seconds = 2.5

[resolver]
backends = ["openalex", "crossref"]
confidence_threshold = 0.9
fetch_citation = true

[credentials]
contact_email = "lab@example.org"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.output.default_dir, PathBuf::from("/tmp/harvest"));
        assert_eq!(config.output.compression_level, 5);
        assert_eq!(config.pipeline.worker_concurrency, 8);
        assert_eq!(config.pipeline.stop_after, StopAfter::Download);
        assert_eq!(config.pipeline.rate_limit.max_requests_per_window, 3);
        assert_eq!(config.pipeline.rate_limit.window_seconds, 2.5);
        assert_eq!(
            config.pipeline.resolver.backends,
            vec![BackendKind::OpenAlex, BackendKind::Crossref]
        );
        assert_eq!(config.pipeline.resolver.confidence_threshold, 0.9);
        assert!(config.pipeline.resolver.fetch_citation);
        assert_eq!(
            config.pipeline.credentials.contact_email.as_deref(),
            Some("lab@example.org")
        );
    }

    #[test]
    fn unknown_backend_rejected() {
        let toml = r#"
[resolver]
backends = ["google_scholar"]
"#;
        assert!(Config::parse(toml).is_err());
    }

    #[test]
    fn from_file_reads_and_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sciharvest.toml");
        std::fs::write(&path, "[download]\nmax_pdf_bytes = 1024\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.pipeline.download.max_pdf_bytes, 1024);

        let err = Config::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("missing.toml"));
    }
}
