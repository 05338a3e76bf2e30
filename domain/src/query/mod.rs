//! Query documents and pipelines
//!
//! The binder half of the tool pipeline: overlaying validated parameters on a
//! stored template, and building the stage lists for aggregate and
//! vectorSearch operations.

pub mod document;
pub mod pipeline;

pub use document::{Document, QueryDocument, get_path, overlay, overlay_except, remove_path};
pub use pipeline::{VectorSearchParamError, VectorSearchRequest, parameter_stages};
