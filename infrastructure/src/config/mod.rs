//! Configuration file loading for docquery
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `DOCQUERY_*` environment variables
//! 2. Explicitly passed config file
//! 3. Project root: `./docquery.toml` or `./.docquery.toml`
//! 4. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileConfig, FileParamAuthService, FileParameterConfig, FileSourceConfig, FileToolConfig,
    FileVectorSearchConfig, SourceKind,
};
pub use loader::{ConfigLoadError, ConfigLoader, ENV_PREFIX};
