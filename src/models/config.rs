//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{License, MetadataLicense};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Repository API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Profile IRIs identifying collections and objects
    #[serde(default)]
    pub conforms_to: ConformsToConfig,

    /// Fallback licenses
    #[serde(default)]
    pub license: LicenseConfig,

    /// Search index connection and bootstrap settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Vocabulary used for property-name normalization
    #[serde(default)]
    pub vocabulary: VocabularyConfig,

    /// Crawl behavior
    #[serde(default)]
    pub crawl: CrawlConfig,

    /// Logging and diagnostics
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api.base_url)?;
        url::Url::parse(&self.search.url)?;
        if self.api.page_size == 0 {
            return Err(AppError::validation("api.page_size must be > 0"));
        }
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.search.index.trim().is_empty() {
            return Err(AppError::validation("search.index is empty"));
        }
        if self.conforms_to.collection.trim().is_empty()
            || self.conforms_to.object.trim().is_empty()
        {
            return Err(AppError::validation(
                "conforms_to.collection and conforms_to.object must be set",
            ));
        }
        if self.vocabulary.prefix.contains(':') {
            return Err(AppError::validation(
                "vocabulary.prefix must not contain ':'",
            ));
        }
        for pattern in &self.crawl.text_formats {
            regex::Regex::new(pattern)?;
        }
        Ok(())
    }
}

/// Repository API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the repository API (e.g. `http://localhost:8080/api`)
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Bearer token sent with file-content requests
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Listing page size
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Request timeout in seconds (0 disables the timeout)
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            admin_token: None,
            page_size: defaults::page_size(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Profile IRIs a root dataset may conform to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformsToConfig {
    #[serde(default = "defaults::collection_profile")]
    pub collection: String,

    #[serde(default = "defaults::object_profile")]
    pub object: String,
}

impl Default for ConformsToConfig {
    fn default() -> Self {
        Self {
            collection: defaults::collection_profile(),
            object: defaults::object_profile(),
        }
    }
}

/// Process-wide fallback licenses, injected into the license resolver.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LicenseConfig {
    /// Content license used when an item declares none
    #[serde(default)]
    pub default: Option<License>,

    /// Metadata license used when a crate descriptor declares none
    #[serde(default)]
    pub default_metadata: Option<MetadataLicense>,
}

/// Search index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the OpenSearch/Elasticsearch node
    #[serde(default = "defaults::search_url")]
    pub url: String,

    /// Index name
    #[serde(default = "defaults::index")]
    pub index: String,

    /// `index.max_result_window` applied when the index is created
    #[serde(default)]
    pub max_result_window: Option<u64>,

    /// JSON file holding the index mappings
    #[serde(default)]
    pub mappings_file: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: defaults::search_url(),
            index: defaults::index(),
            max_result_window: None,
            mappings_file: None,
        }
    }
}

impl SearchConfig {
    /// Body for the index-create request.
    pub fn create_body(&self) -> Result<Value> {
        let mut body = serde_json::json!({});
        if let Some(window) = self.max_result_window {
            body["settings"] = serde_json::json!({ "index": { "max_result_window": window } });
        }
        if let Some(path) = &self.mappings_file {
            let content = fs::read_to_string(path)?;
            body["mappings"] = serde_json::from_str(&content)?;
        }
        Ok(body)
    }
}

/// Vocabulary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Namespace IRI whose terms get the short prefix
    #[serde(default = "defaults::namespace")]
    pub namespace: String,

    /// Short prefix for the namespace
    #[serde(default = "defaults::prefix")]
    pub prefix: String,

    /// JSON-LD context file with term definitions
    #[serde(default)]
    pub context_file: Option<PathBuf>,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            namespace: defaults::namespace(),
            prefix: defaults::prefix(),
            context_file: None,
        }
    }
}

/// What to do when a listing or graph fetch fails mid-crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchErrorPolicy {
    /// Log, record a diagnostic, continue with siblings
    #[default]
    Skip,
    /// Propagate the error and end the crawl
    Abort,
}

/// Crawl behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// JSON file with an array of id patterns to skip
    #[serde(default)]
    pub skip_file: Option<PathBuf>,

    #[serde(default)]
    pub on_fetch_error: FetchErrorPolicy,

    /// Regexes an `encodingFormat` must match for its content to be indexed
    #[serde(default = "defaults::text_formats")]
    pub text_formats: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            skip_file: None,
            on_fetch_error: FetchErrorPolicy::default(),
            text_formats: defaults::text_formats(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory receiving diagnostic payloads of failed items
    #[serde(default = "defaults::log_folder")]
    pub log_folder: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_folder: defaults::log_folder(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Api defaults
    pub fn base_url() -> String {
        "http://localhost:8080/api".into()
    }
    pub fn page_size() -> usize {
        1000
    }
    pub fn timeout() -> u64 {
        60
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; crate-indexer/0.1)".into()
    }

    // Profile defaults
    pub fn collection_profile() -> String {
        "https://w3id.org/ldac/profile#Collection".into()
    }
    pub fn object_profile() -> String {
        "https://w3id.org/ldac/profile#Object".into()
    }

    // Search defaults
    pub fn search_url() -> String {
        "http://localhost:9200".into()
    }
    pub fn index() -> String {
        "items".into()
    }

    // Vocabulary defaults
    pub fn namespace() -> String {
        "https://w3id.org/ldac/terms#".into()
    }
    pub fn prefix() -> String {
        "ldac".into()
    }

    // Crawl defaults
    pub fn text_formats() -> Vec<String> {
        vec!["^text/".into()]
    }

    // Logging defaults
    pub fn log_folder() -> PathBuf {
        PathBuf::from("logs")
    }
}
