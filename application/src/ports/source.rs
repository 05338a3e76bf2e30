//! Source port
//!
//! A source is a named binding to some backing system, built by the host
//! from configuration. Tools look their source up by name when bound and
//! check that it offers the capability they need.

use crate::ports::document_store::DocumentStore;
use std::collections::HashMap;
use std::sync::Arc;

/// A configured source binding
pub trait Source: Send + Sync {
    /// Configured name of this source
    fn name(&self) -> &str;

    /// Kind tag (e.g. `"mongodb"`, `"memory"`)
    fn kind(&self) -> &str;

    /// Document store handle, if this source is backed by one
    fn document_store(&self) -> Option<Arc<dyn DocumentStore>>;
}

/// Sources by name, as handed to tool binding
pub type SourceMap = HashMap<String, Arc<dyn Source>>;
