//! Merge rules: built-in defaults sit beneath every other source.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("server.listen_addr", "127.0.0.1:8080")?
        .set_default("server.mount", "/mock")?
        .set_default("cache.max_entries", 1000)?
        .set_default("cache.ttl_secs", 900)?
        .set_default("generation.max_blocks", 2)?
        .set_default("generation.min_score", 0.25)?
        .set_default("generation.budget_chars", 3000)?
        .set_default("generation.schema_validation", true)?
        .set_default("generation.max_latency_secs", 60)?
        .set_default("blocks.enabled", true)?
        .set_default("provider.provider_type", "ollama")?
        .set_default("provider.model", "llama3.1:8b")
}
