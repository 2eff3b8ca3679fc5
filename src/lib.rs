//! Crawl Executor: hands a precomputed crawl plan to a distributed crawl cluster
//!
//! This crate gates execution on cluster health, propagates per-domain rate
//! limits to the cluster's control plane, and streams a URL dump into the
//! cluster's Kafka ingestion topic.

pub mod cluster;
pub mod config;
pub mod executor;
pub mod ids;
pub mod plan;
pub mod producer;
pub mod source;

use std::path::PathBuf;
use thiserror::Error;

/// Application id sent with every control-plane request and crawl message
pub const APP_ID: &str = "crawl_planner";

/// Main error type for Crawl Executor operations
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Control plane error: {0}")]
    Cluster(#[from] cluster::ClusterError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while reading the crawl plan or the URL dump
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse crawl plan: {0}")]
    Plan(#[from] serde_yaml::Error),

    #[error("Failed to read URL dump: {0}")]
    Csv(#[from] csv::Error),

    #[error("URL dump {path} has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Invalid domain in crawl plan: {0}")]
    InvalidDomain(String),
}

/// Result type alias for Crawl Executor operations
pub type Result<T> = std::result::Result<T, ExecutorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for input operations
pub type InputResult<T> = std::result::Result<T, InputError>;

// Re-export commonly used types
pub use config::Config;
pub use executor::{Executor, RunOutcome};
pub use plan::{CrawlPlan, DomainLimit};
pub use producer::{MessageProducer, ProduceSummary};
pub use source::{UrlRow, UrlSource};
