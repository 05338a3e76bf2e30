//! Domain layer for docquery
//!
//! This crate contains the pure core of declarative document-query tools:
//! configuration entities, parameter schemas and validation, manifest
//! projection, the authorization gate and query overlay. It performs no I/O
//! and has no dependency on the backing store.
//!
//! # Core Concepts
//!
//! ## Query Tool
//!
//! A tool is declared once (collection, base query template, parameters,
//! operation) and invoked many times with untyped arguments. Each invocation
//! validates its arguments against the [`ParameterSchema`], overlays them on
//! a fresh copy of the template and hands the result to the dispatcher.
//!
//! ## Operations
//!
//! - **find**: the bound document is used as a filter
//! - **aggregate**: a pipeline is built but not executed
//! - **vectorSearch**: a similarity stage ranks documents by embedding

pub mod config;
pub mod query;
pub mod tool;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, Severity};
pub use query::{Document, QueryDocument, VectorSearchParamError, VectorSearchRequest};
pub use tool::{
    Claims, InvocationSchema, Manifest, Operation, ParamValues, Parameter, ParameterSchema,
    ParameterType, QUERY_TOOL_KIND, QueryToolConfig, SchemaError, ValidationError,
    VectorSearchTuning, is_authorized,
};
