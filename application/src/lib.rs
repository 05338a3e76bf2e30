//! Application layer for docquery
//!
//! This crate contains use cases and port definitions.
//! It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use ports::{
    document_store::{DocumentCollection, DocumentStore, DocumentStream, StoreError},
    source::{Source, SourceMap},
    tool::{InvokeError, Tool},
};
pub use use_cases::dispatch::OperationDispatcher;
pub use use_cases::query_tool::{ConfigurationError, QueryTool};
