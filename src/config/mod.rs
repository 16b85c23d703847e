//! Configuration module for Steamgraph
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use steamgraph::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("steamgraph.toml")).unwrap();
//! println!("Highest crawl level: {}", config.crawler.max_crawl_level);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, GraphConfig, OutputConfig, QueueBackend, QueueConfig, SteamApiConfig,
    StorageConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, STEAM_API_KEY_ENV};
