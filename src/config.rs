use crate::detect::EndpointKind;
use crate::error::{ExporterError, Result as ExporterResult};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub census: CensusConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub communities: Vec<CommunityConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CensusConfig {
    /// Target file of the one-shot run
    #[serde(default = "default_output")]
    pub output: String,
    /// Maximum number of endpoints fetched at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Optional `communities.json` in the `{"name": ["url", ...]}` layout
    #[serde(default)]
    pub communities_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CommunityConfig {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
    #[serde(skip)]
    pub origin: CommunityOrigin,
}

/// Where a community was configured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommunityOrigin {
    /// `[[communities]]` in the configuration file
    #[default]
    ConfigFile,
    /// A legacy `communities.json`
    LegacyFile,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default)]
    pub kind: Option<EndpointKind>,
}

impl CommunityConfig {
    /// Human-readable name, falling back to the id
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: None,
        }
    }

    /// Declared kind, or the kind implied by the URL's file name
    pub fn kind(&self) -> EndpointKind {
        self.kind
            .unwrap_or_else(|| EndpointKind::from_url(&self.url))
    }
}

fn default_output() -> String {
    "./gluon-census.prom".to_string()
}

fn default_concurrency() -> usize {
    16
}

fn default_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("gluon-census-exporter/{}", env!("CARGO_PKG_VERSION"))
}

fn default_verify_ssl() -> bool {
    true
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9103
}

fn default_interval() -> u64 {
    300
}

impl Default for CensusConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            concurrency: default_concurrency(),
            communities_file: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            verify_ssl: default_verify_ssl(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            interval_seconds: default_interval(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("GLUON_CENSUS").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let mut config: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if let Some(file) = config.census.communities_file.clone() {
            config
                .add_communities_file(&file)
                .with_context(|| format!("Failed to load communities file {}", file))?;
        }

        Ok(config)
    }

    /// Append the communities of a legacy `communities.json`
    pub fn add_communities_file(&mut self, path: impl AsRef<Path>) -> ExporterResult<()> {
        let content = std::fs::read_to_string(path)?;
        self.communities.extend(parse_legacy_communities(&content)?);
        Ok(())
    }

    /// Check invariants the census relies on
    ///
    /// A community without endpoints is not an error; it is reported down.
    pub fn validate(&self) -> ExporterResult<()> {
        if self.census.concurrency == 0 {
            return Err(ExporterError::Config(
                "census.concurrency must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for community in &self.communities {
            if community.id.trim().is_empty() {
                return Err(ExporterError::Config(
                    "community id must not be empty".to_string(),
                ));
            }
            if !seen.insert(community.id.as_str()) {
                return Err(ExporterError::Config(format!(
                    "duplicate community id: {}",
                    community.id
                )));
            }
            if community.endpoints.is_empty() {
                warn!("Community {} has no endpoints configured", community.id);
            }
        }
        Ok(())
    }
}

/// Parse the `{"name": ["url", ...]}` layout; names serve as id and label
///
/// Communities keep the order of the file.
pub fn parse_legacy_communities(content: &str) -> ExporterResult<Vec<CommunityConfig>> {
    let mapping: serde_json::Map<String, serde_json::Value> = serde_json::from_str(content)?;
    mapping
        .into_iter()
        .map(|(id, urls)| -> ExporterResult<CommunityConfig> {
            let urls: Vec<String> = serde_json::from_value(urls)?;
            Ok(CommunityConfig {
                id,
                label: None,
                endpoints: urls.into_iter().map(EndpointConfig::new).collect(),
                origin: CommunityOrigin::LegacyFile,
            })
        })
        .collect()
}

/// The communities that came from a legacy `communities.json`
pub fn from_legacy_file(communities: &[CommunityConfig]) -> Vec<CommunityConfig> {
    communities
        .iter()
        .filter(|c| c.origin == CommunityOrigin::LegacyFile)
        .cloned()
        .collect()
}

/// Serialize communities back into the legacy layout, in the given order
pub fn legacy_communities_json(communities: &[CommunityConfig]) -> ExporterResult<String> {
    let mapping: serde_json::Map<String, serde_json::Value> = communities
        .iter()
        .map(|c| {
            let urls = c
                .endpoints
                .iter()
                .map(|e| serde_json::Value::from(e.url.as_str()))
                .collect();
            (c.id.clone(), serde_json::Value::Array(urls))
        })
        .collect();
    let mut json = serde_json::to_string_pretty(&mapping)?;
    json.push('\n');
    Ok(json)
}
