//! Shared types, error model, and configuration for Nobestudy.
//!
//! This crate is the foundation depended on by all other Nobestudy crates.
//! It provides:
//! - [`NobestudyError`], the unified error type
//! - Domain types ([`QueryType`], [`Source`], [`ScrapeResult`], [`ExportRequest`], [`FileType`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ExportConfig, FailurePolicy, HttpConfig, SourcesConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_sources,
};
pub use error::{NobestudyError, Result};
pub use types::{
    CONTENT_NOT_FOUND, ExportRequest, FileType, INVALID_QUERY_TYPE, QueryType, ScrapeResult,
    Source,
};
