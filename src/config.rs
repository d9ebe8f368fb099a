use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::models::EntityRef;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub glean: GleanConfig,
    pub app: AppConfig,
    pub techdocs: TechDocsConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    pub entity: EntityConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Glean indexing API settings.
#[derive(Debug, Deserialize, Clone)]
pub struct GleanConfig {
    /// Base URL of the Glean indexing API, e.g.
    /// `https://example-be.glean.com/api/index/v1`.
    pub api_base_url: String,
    /// API token. May be omitted in favor of `GLEAN_API_TOKEN`.
    #[serde(default)]
    pub token: Option<String>,
    /// Datasource name under which documents are indexed.
    #[serde(default = "default_datasource")]
    pub datasource: String,
}

fn default_datasource() -> String {
    "backstage".to_string()
}

impl GleanConfig {
    /// Resolves the API token from the config file or `GLEAN_API_TOKEN`.
    pub fn api_token(&self) -> Result<String> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        std::env::var("GLEAN_API_TOKEN")
            .context("glean.token not set and GLEAN_API_TOKEN environment variable not set")
    }
}

/// Frontend application settings used for view URLs.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Base URL of the app serving the rendered docs pages.
    pub base_url: String,
}

/// TechDocs backend settings.
#[derive(Debug, Deserialize, Clone)]
pub struct TechDocsConfig {
    /// Base URL of the TechDocs backend API.
    pub base_url: String,
    /// Bearer token for TechDocs requests. May be omitted in favor of
    /// `TECHDOCS_TOKEN`; requests go unauthenticated when neither is set.
    #[serde(default)]
    pub token: Option<String>,
}

/// Catalog API settings. Optional; enables catalog-driven entity discovery.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    /// Bearer token for catalog requests. May be omitted in favor of
    /// `CATALOG_TOKEN`.
    #[serde(default)]
    pub token: Option<String>,
    /// When true, the run indexes every entity the catalog reports as
    /// carrying TechDocs instead of the fixed `[entity]`.
    #[serde(default)]
    pub discover: bool,
}

/// The fixed entity indexed when catalog discovery is off.
#[derive(Debug, Deserialize, Clone)]
pub struct EntityConfig {
    #[serde(default = "default_entity_namespace")]
    pub namespace: String,
    #[serde(default = "default_entity_kind")]
    pub kind: String,
    pub name: String,
}

fn default_entity_namespace() -> String {
    "default".to_string()
}

fn default_entity_kind() -> String {
    "component".to_string()
}

impl EntityConfig {
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef {
            namespace: self.namespace.clone(),
            kind: self.kind.clone(),
            name: self.name.clone(),
        }
    }
}

/// Recurring run schedule.
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_frequency_minutes")]
    pub frequency_minutes: u64,
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,
    #[serde(default = "default_initial_delay_seconds")]
    pub initial_delay_seconds: u64,
}

fn default_frequency_minutes() -> u64 {
    10
}
fn default_timeout_minutes() -> u64 {
    15
}
fn default_initial_delay_seconds() -> u64 {
    3
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            frequency_minutes: default_frequency_minutes(),
            timeout_minutes: default_timeout_minutes(),
            initial_delay_seconds: default_initial_delay_seconds(),
        }
    }
}

impl ScheduleConfig {
    pub fn frequency(&self) -> Duration {
        Duration::from_secs(self.frequency_minutes * 60)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_minutes * 60)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_seconds)
    }
}

/// HTTP trigger endpoint settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate URLs
    if config.glean.api_base_url.trim().is_empty() {
        anyhow::bail!("glean.api_base_url must not be empty");
    }
    if config.app.base_url.trim().is_empty() {
        anyhow::bail!("app.base_url must not be empty");
    }
    if config.techdocs.base_url.trim().is_empty() {
        anyhow::bail!("techdocs.base_url must not be empty");
    }

    // Normalize: URL paths are built with a joining slash
    config.glean.api_base_url = config.glean.api_base_url.trim_end_matches('/').to_string();
    config.app.base_url = config.app.base_url.trim_end_matches('/').to_string();
    config.techdocs.base_url = config.techdocs.base_url.trim_end_matches('/').to_string();
    if let Some(catalog_url) = config.catalog.base_url.take() {
        config.catalog.base_url = Some(catalog_url.trim_end_matches('/').to_string());
    }

    // Validate entity
    if config.entity.name.trim().is_empty() {
        anyhow::bail!("entity.name must not be empty");
    }

    // Validate schedule
    if config.schedule.frequency_minutes == 0 {
        anyhow::bail!("schedule.frequency_minutes must be > 0");
    }
    if config.schedule.timeout_minutes == 0 {
        anyhow::bail!("schedule.timeout_minutes must be > 0");
    }

    // Validate catalog discovery
    if config.catalog.discover && config.catalog.base_url.is_none() {
        anyhow::bail!("catalog.discover requires catalog.base_url");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const MINIMAL: &str = r#"
[glean]
api_base_url = "https://example-be.glean.com/api/index/v1/"

[app]
base_url = "http://localhost:3000"

[techdocs]
base_url = "http://localhost:7007/api/techdocs/"

[entity]
name = "some-handbook"
"#;

    #[test]
    fn minimal_config_applies_defaults() {
        let file = write_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.glean.datasource, "backstage");
        assert_eq!(config.entity.namespace, "default");
        assert_eq!(config.entity.kind, "component");
        assert_eq!(config.schedule.frequency_minutes, 10);
        assert_eq!(config.schedule.timeout_minutes, 15);
        assert_eq!(config.schedule.initial_delay_seconds, 3);
        assert!(!config.catalog.discover);
    }

    #[test]
    fn base_urls_are_normalized() {
        let file = write_config(MINIMAL);
        let config = load_config(file.path()).unwrap();

        assert_eq!(
            config.glean.api_base_url,
            "https://example-be.glean.com/api/index/v1"
        );
        assert_eq!(config.techdocs.base_url, "http://localhost:7007/api/techdocs");
    }

    #[test]
    fn empty_entity_name_is_rejected() {
        let file = write_config(&MINIMAL.replace("some-handbook", " "));
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("entity.name"));
    }

    #[test]
    fn discovery_without_catalog_url_is_rejected() {
        let content = format!("{MINIMAL}\n[catalog]\ndiscover = true\n");
        let file = write_config(&content);
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("catalog.base_url"));
    }

    #[test]
    fn zero_frequency_is_rejected() {
        let content = format!("{MINIMAL}\n[schedule]\nfrequency_minutes = 0\n");
        let file = write_config(&content);
        assert!(load_config(file.path()).is_err());
    }
}
