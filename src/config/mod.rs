//! Configuration module for Crawl Executor
//!
//! This module handles loading, parsing, and validating the TOML configuration
//! file that points the executor at a cluster.
//!
//! # Example
//!
//! ```no_run
//! use crawl_executor::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl-executor.toml")).unwrap();
//! println!("Publishing to topic: {}", config.kafka.topic);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ClusterConfig, Config, InputConfig, KafkaConfig, ProducerConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
