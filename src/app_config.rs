use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::language_utils::LanguagePair;

/// Engine configuration module
/// This module holds the single configuration record consumed by the core:
/// store coordinates, language selection, backend selection, execution
/// topology knobs and safety limits. The record is serializable because
/// planned-mode jobs carry their full configuration onto the broker.
/// Translation backend selector
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Neural backend served over HTTP (Argos-compatible API)
    #[default]
    Argos,
    /// Rule-based backend shelling out to the apertium toolchain
    Apertium,
    /// In-process mock backend, used by the test suite
    Mock,
}

impl Backend {
    /// Stable identifier stored in translation records
    pub fn label(&self) -> &'static str {
        match self {
            Self::Argos => "ARGOS",
            Self::Apertium => "APERTIUM",
            Self::Mock => "MOCK",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label().to_lowercase())
    }
}

impl std::str::FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "argos" => Ok(Self::Argos),
            "apertium" => Ok(Self::Apertium),
            "mock" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid backend name: {}", s)),
        }
    }
}

/// Represents the full engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Document store URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Index to search and update
    #[serde(default = "default_index")]
    pub index: String,

    /// Backend used to perform the translation
    #[serde(default)]
    pub backend: Backend,

    /// Endpoint for HTTP-served backends (neural)
    #[serde(default = "default_backend_endpoint")]
    pub backend_endpoint: String,

    /// Source language code (ISO 639)
    pub source_language: String,

    /// Target language code (ISO 639)
    pub target_language: String,

    /// Optional intermediary language used when no direct pair exists.
    /// When absent, the resolver searches for one automatically.
    #[serde(default)]
    pub intermediary_language: Option<String>,

    /// Document field to translate
    #[serde(default = "default_source_field")]
    pub source_field: String,

    /// Document field where translations are stored
    #[serde(default = "default_target_field")]
    pub target_field: String,

    /// Optional query string to filter candidate documents
    #[serde(default)]
    pub query_string: Option<String>,

    /// Directory where language packs are downloaded
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Scan cursor lease literal (e.g. "5m", "90s")
    #[serde(default = "default_scan_scroll")]
    pub scan_scroll: String,

    /// Number of documents per scan page
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,

    /// Don't save anything in the store
    #[serde(default)]
    pub dry_run: bool,

    /// Override existing translations for the same tuple
    #[serde(default)]
    pub force: bool,

    /// Number of parallel translation workers (immediate mode)
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Per-job timeout in seconds
    #[serde(default = "default_pool_timeout_secs")]
    pub pool_timeout_secs: u64,

    /// Delay in milliseconds after each job, to bound load on the store
    #[serde(default)]
    pub throttle_ms: u64,

    /// Max translated content length literal (`[0-9]+[KMG]?`)
    #[serde(default = "default_max_content_length")]
    pub max_content_length: String,

    /// Broker database URL/path (planned mode)
    #[serde(default = "default_broker_url")]
    pub broker_url: String,

    /// Queue translations onto the broker instead of processing them now
    #[serde(default)]
    pub plan: bool,

    /// Display a progress bar during immediate runs
    #[serde(default)]
    pub progressbar: bool,
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "local-datashare".to_string()
}

fn default_backend_endpoint() -> String {
    "http://localhost:5000".to_string()
}

fn default_source_field() -> String {
    "content".to_string()
}

fn default_target_field() -> String {
    "content_translated".to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("estrans")
}

fn default_scan_scroll() -> String {
    "5m".to_string()
}

fn default_scan_page_size() -> usize {
    10
}

fn default_pool_size() -> usize {
    1
}

fn default_pool_timeout_secs() -> u64 {
    30 * 60
}

fn default_max_content_length() -> String {
    // Large enough to be effectively unlimited; exists to protect
    // downstream highlighting, not translation quality.
    "19G".to_string()
}

fn default_broker_url() -> String {
    "estrans-queue.db".to_string()
}

static MAX_CONTENT_LENGTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)([KMG])?$").unwrap());

static DURATION_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)(ms|s|m|h)?$").unwrap());

/// Parse a content length literal with an optional K/M/G suffix, each
/// multiplying by 1024
pub fn parse_max_content_length(value: &str) -> Result<u64, EngineError> {
    let caps = MAX_CONTENT_LENGTH_RE.captures(value.trim()).ok_or_else(|| {
        EngineError::Config(format!(
            "max content length should be a number optionally followed by K, M or G, got '{}'",
            value
        ))
    })?;

    let base: u64 = caps[1]
        .parse()
        .map_err(|_| EngineError::Config(format!("max content length '{}' overflows", value)))?;
    let multiplier: u64 = match caps.get(2).map(|m| m.as_str()) {
        Some("K") => 1024,
        Some("M") => 1024 * 1024,
        Some("G") => 1024 * 1024 * 1024,
        _ => 1,
    };

    base.checked_mul(multiplier)
        .ok_or_else(|| EngineError::Config(format!("max content length '{}' overflows", value)))
}

/// Parse a duration literal like "5m", "90s", "500ms" (bare numbers are
/// seconds)
pub fn parse_duration_literal(value: &str) -> Result<Duration, EngineError> {
    let caps = DURATION_LITERAL_RE.captures(value.trim()).ok_or_else(|| {
        EngineError::Config(format!("invalid duration literal '{}'", value))
    })?;

    let base: u64 = caps[1]
        .parse()
        .map_err(|_| EngineError::Config(format!("duration '{}' overflows", value)))?;

    Ok(match caps.get(2).map(|m| m.as_str()) {
        Some("ms") => Duration::from_millis(base),
        Some("m") => Duration::from_secs(base * 60),
        Some("h") => Duration::from_secs(base * 3600),
        _ => Duration::from_secs(base),
    })
}

impl Config {
    /// Validate the configuration before any work starts.
    ///
    /// Invalid language codes, a degenerate pair, an unparseable store URL
    /// or a malformed size/duration literal are all fatal here, not once
    /// documents are in flight.
    pub fn validate(&self) -> Result<(), EngineError> {
        // Also rejects degenerate source/target pairs
        LanguagePair::new(&self.source_language, &self.target_language)?;

        if let Some(intermediary) = &self.intermediary_language {
            crate::language_utils::normalize_code(intermediary)?;
        }

        url::Url::parse(&self.url)
            .map_err(|e| EngineError::Config(format!("invalid store URL '{}': {}", self.url, e)))?;

        if self.index.trim().is_empty() {
            return Err(EngineError::Config("index name cannot be empty".to_string()));
        }
        if self.pool_size == 0 {
            return Err(EngineError::Config("pool size must be at least 1".to_string()));
        }
        if self.scan_page_size == 0 {
            return Err(EngineError::Config("scan page size must be at least 1".to_string()));
        }

        parse_max_content_length(&self.max_content_length)?;
        parse_duration_literal(&self.scan_scroll)?;

        Ok(())
    }

    /// The requested language pair
    pub fn pair(&self) -> Result<LanguagePair, EngineError> {
        LanguagePair::new(&self.source_language, &self.target_language)
    }

    /// Max content length in bytes
    pub fn max_content_length_bytes(&self) -> Result<u64, EngineError> {
        parse_max_content_length(&self.max_content_length)
    }

    /// Scan cursor lease duration
    pub fn scan_lease(&self) -> Result<Duration, EngineError> {
        parse_duration_literal(&self.scan_scroll)
    }

    /// Per-job timeout
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout_secs)
    }

    /// Post-job throttle delay
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

/// Default implementation for Config, used by tests; the CLI always sets
/// the languages explicitly.
impl Default for Config {
    fn default() -> Self {
        Config {
            url: default_url(),
            index: default_index(),
            backend: Backend::default(),
            backend_endpoint: default_backend_endpoint(),
            source_language: "fr".to_string(),
            target_language: "en".to_string(),
            intermediary_language: None,
            source_field: default_source_field(),
            target_field: default_target_field(),
            query_string: None,
            data_dir: default_data_dir(),
            scan_scroll: default_scan_scroll(),
            scan_page_size: default_scan_page_size(),
            dry_run: false,
            force: false,
            pool_size: default_pool_size(),
            pool_timeout_secs: default_pool_timeout_secs(),
            throttle_ms: 0,
            max_content_length: default_max_content_length(),
            broker_url: default_broker_url(),
            plan: false,
            progressbar: false,
        }
    }
}
