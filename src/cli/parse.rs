//! CLI parse: clap types for synthmock. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// synthmock - schema-conformant synthetic responses for OpenAPI specifications
#[derive(Parser, Debug)]
#[command(name = "synthmock")]
#[command(about = "Serve model-generated mock responses for an OpenAPI specification")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (config/ is read from here)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// OpenAPI specification (JSON or YAML); overrides spec.path
    #[arg(long)]
    pub spec: Option<PathBuf>,

    /// Enable verbose logging (default: off, except for `serve`)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP mock server
    Serve {
        /// Listen address, e.g. 127.0.0.1:8080
        #[arg(long)]
        listen: Option<String>,
        /// Mount prefix for mock requests, e.g. /mock
        #[arg(long)]
        mount: Option<String>,
    },
    /// Show which operation handles a request and the response plan
    Resolve {
        /// HTTP method
        method: String,
        /// Request path, relative to the mount prefix
        path: String,
        /// Scenario (happy, edge, invalid, rate-limit, server-error)
        #[arg(long, default_value = "happy")]
        scenario: String,
        /// Force a status code
        #[arg(long)]
        status: Option<u16>,
    },
    /// Print the neutral schema document for a component schema
    Translate {
        /// Component schema name (components.schemas key)
        component: String,
    },
    /// Score context blocks for an endpoint and show the selection
    Blocks {
        /// Request path or path template
        path: String,
        /// HTTP method
        #[arg(long, default_value = "GET")]
        method: String,
        /// Operation id to score against
        #[arg(long)]
        operation_id: Option<String>,
    },
}
