//! Configuration System
//!
//! Layered configuration for the mock server: built-in defaults, a global
//! user file, workspace files and `SYNTHMOCK__SECTION__KEY` environment
//! variables, in increasing precedence. Tests included.

use crate::blocks::{ExternalBlockLoader, SelectionBudget};
use crate::generation::CacheConfig;
use crate::logging::LoggingConfig;
use crate::prompt::PromptLimits;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub spec: SpecConfig,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub blocks: BlocksConfig,

    /// Model provider used by the generator
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Prefix under which mock requests are served
    #[serde(default = "default_mount")]
    pub mount: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_mount() -> String {
    "/mock".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            mount: default_mount(),
        }
    }
}

/// Specification loaded at startup, if any
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_max_entries() -> usize {
    1000
}

fn default_ttl_secs() -> u64 {
    900
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheSettings {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.max_entries,
            ttl: Duration::from_secs(self.ttl_secs),
        }
    }
}

/// Block selection, prompt caps and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_blocks")]
    pub max_blocks: usize,

    #[serde(default = "default_min_score")]
    pub min_score: f64,

    #[serde(default = "default_budget_chars")]
    pub budget_chars: usize,

    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    #[serde(default = "default_max_schema_chars")]
    pub max_schema_chars: usize,

    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Log schema violations in generated bodies; never triggers a repair
    #[serde(default = "default_true")]
    pub schema_validation: bool,

    /// Ceiling for `X-Mock-Latency`; longer requests are clamped
    #[serde(default = "default_max_latency_secs")]
    pub max_latency_secs: u64,
}

fn default_max_blocks() -> usize {
    2
}

fn default_min_score() -> f64 {
    0.25
}

fn default_budget_chars() -> usize {
    3000
}

fn default_max_prompt_chars() -> usize {
    16000
}

fn default_max_schema_chars() -> usize {
    6000
}

fn default_max_context_chars() -> usize {
    4000
}

fn default_max_latency_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_blocks: default_max_blocks(),
            min_score: default_min_score(),
            budget_chars: default_budget_chars(),
            max_prompt_chars: default_max_prompt_chars(),
            max_schema_chars: default_max_schema_chars(),
            max_context_chars: default_max_context_chars(),
            schema_validation: default_true(),
            max_latency_secs: default_max_latency_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn selection_budget(&self) -> SelectionBudget {
        SelectionBudget {
            max_blocks: self.max_blocks,
            min_score: self.min_score,
            budget_chars: self.budget_chars,
        }
    }

    pub fn prompt_limits(&self) -> PromptLimits {
        PromptLimits {
            max_prompt_chars: self.max_prompt_chars,
            max_schema_chars: self.max_schema_chars,
            max_context_chars: self.max_context_chars,
            ..PromptLimits::default()
        }
    }

    pub fn max_latency(&self) -> Duration {
        Duration::from_secs(self.max_latency_secs)
    }
}

/// External context block definitions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocksConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Defaults to `~/.synthmock/blocks`
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for BlocksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
        }
    }
}

impl BlocksConfig {
    pub fn resolved_directory(&self) -> Option<PathBuf> {
        self.directory.clone().or_else(|| {
            directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".synthmock").join("blocks"))
        })
    }

    pub fn loader(&self) -> ExternalBlockLoader {
        match (self.enabled, self.resolved_directory()) {
            (true, Some(directory)) => ExternalBlockLoader::new(directory),
            _ => ExternalBlockLoader::disabled(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Server(String),
    Cache(String),
    Generation(String),
    Provider(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Server(msg) => write!(f, "Server: {}", msg),
            ValidationError::Cache(msg) => write!(f, "Cache: {}", msg),
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl MockConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.server.listen_addr.parse::<SocketAddr>() {
            errors.push(ValidationError::Server(format!(
                "Invalid listen address '{}': {}",
                self.server.listen_addr, e
            )));
        }
        if !self.server.mount.starts_with('/') || self.server.mount.len() < 2 {
            errors.push(ValidationError::Server(format!(
                "Mount prefix '{}' must start with '/' and name a path segment",
                self.server.mount
            )));
        } else if self.server.mount.ends_with('/') {
            errors.push(ValidationError::Server(format!(
                "Mount prefix '{}' must not end with '/'",
                self.server.mount
            )));
        }

        if self.cache.max_entries > 0 && self.cache.ttl_secs == 0 {
            errors.push(ValidationError::Cache(
                "TTL must be positive when caching is enabled".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.generation.min_score) {
            errors.push(ValidationError::Generation(format!(
                "min_score {} outside 0.0-1.0",
                self.generation.min_score
            )));
        }
        if self.generation.max_prompt_chars == 0
            || self.generation.max_schema_chars == 0
            || self.generation.max_context_chars == 0
        {
            errors.push(ValidationError::Generation(
                "Prompt character caps must be positive".to_string(),
            ));
        }

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
