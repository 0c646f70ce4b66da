//! Configuration module for Tablecrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; a crawl only needs a start URL, which may also
//! come from the command line.
//!
//! # Example
//!
//! ```no_run
//! use tablecrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("tablecrawl.toml")).unwrap();
//! println!("Rows per chunk: {}", config.output.chunk_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
