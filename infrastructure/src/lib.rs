//! Infrastructure layer for docquery
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: configuration file loading, document store
//! sources and the tool set that binds configured tools to them.

pub mod config;
pub mod sources;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigLoadError, ConfigLoader, FileConfig, FileParameterConfig, FileSourceConfig,
    FileToolConfig, SourceKind,
};
pub use sources::{MemorySource, MemoryStore, SourceBuildError, build_source, build_sources};
#[cfg(feature = "mongodb")]
pub use sources::MongoSource;
pub use tools::{CallContext, CallError, ToolSet, ToolSetError};
