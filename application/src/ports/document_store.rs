//! Document store port
//!
//! Defines the interface to the document-oriented backing store. Connection
//! management, pooling and retry belong to the adapter; tools only borrow a
//! shared handle and ask it for collections.

use async_trait::async_trait;
use docquery_domain::QueryDocument;
use futures::stream::BoxStream;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by a backing store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store refused the filter or pipeline
    #[error("Query rejected: {0}")]
    Rejected(String),

    /// The result stream terminated abnormally
    #[error("Cursor error: {0}")]
    Cursor(String),

    /// A stored item could not be read as a document
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Stream of raw documents produced by a store operation.
///
/// Items are untyped JSON values; callers decide whether each one is a valid
/// document. Dropping the stream releases the underlying cursor.
pub type DocumentStream = BoxStream<'static, Result<Value, StoreError>>;

/// A single collection within a database
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Run a filter read.
    async fn find(&self, filter: QueryDocument) -> Result<DocumentStream, StoreError>;

    /// Run an aggregation pipeline.
    async fn aggregate(&self, pipeline: Vec<QueryDocument>) -> Result<DocumentStream, StoreError>;
}

/// Shared handle to a backing store
///
/// Implementations must be safe for concurrent use: one handle is shared by
/// every tool bound to the same source and by all their in-flight calls.
pub trait DocumentStore: Send + Sync {
    /// Database the owning source is scoped to
    fn database_name(&self) -> &str;

    /// Look up a collection by database and name
    fn collection(&self, database: &str, name: &str) -> Arc<dyn DocumentCollection>;
}
