//! MongoDB source (feature `mongodb`)
//!
//! Thin adapter from the document store ports to the official driver.
//! Pooling, retry and server selection are left to the driver.

use super::SourceBuildError;
use crate::config::FileSourceConfig;
use async_trait::async_trait;
use docquery_application::{
    DocumentCollection, DocumentStore, DocumentStream, Source, StoreError,
};
use docquery_domain::QueryDocument;
use futures::StreamExt;
use mongodb::bson::{self, Bson, Document as BsonDocument};
use mongodb::error::ErrorKind;
use mongodb::{Client, Collection};
use std::sync::Arc;

/// Kind tag of [`MongoSource`]
pub const MONGODB_SOURCE_KIND: &str = "mongodb";

fn store_error(err: mongodb::error::Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => StoreError::Connection(err.to_string()),
        _ => StoreError::Rejected(err.to_string()),
    }
}

/// Errors raised while reading a cursor.
///
/// A stored document the driver cannot deserialize is a decode failure, not
/// a broken cursor.
fn cursor_error(err: mongodb::error::Error) -> StoreError {
    match err.kind.as_ref() {
        ErrorKind::BsonDeserialization(_) => StoreError::Decode(err.to_string()),
        _ => StoreError::Cursor(err.to_string()),
    }
}

fn to_bson(document: &QueryDocument) -> Result<BsonDocument, StoreError> {
    bson::to_document(document).map_err(|e| StoreError::Rejected(e.to_string()))
}

/// Driver cursor as a stream of relaxed extended JSON values.
fn into_stream(cursor: mongodb::Cursor<BsonDocument>) -> DocumentStream {
    cursor
        .map(|item| {
            item.map(|document| Bson::Document(document).into_relaxed_extjson())
                .map_err(cursor_error)
        })
        .boxed()
}

pub struct MongoCollection {
    inner: Collection<BsonDocument>,
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    async fn find(&self, filter: QueryDocument) -> Result<DocumentStream, StoreError> {
        let cursor = self.inner.find(to_bson(&filter)?).await.map_err(store_error)?;
        Ok(into_stream(cursor))
    }

    async fn aggregate(&self, pipeline: Vec<QueryDocument>) -> Result<DocumentStream, StoreError> {
        let stages = pipeline
            .iter()
            .map(to_bson)
            .collect::<Result<Vec<_>, _>>()?;
        let cursor = self.inner.aggregate(stages).await.map_err(store_error)?;
        Ok(into_stream(cursor))
    }
}

pub struct MongoStore {
    client: Client,
    database: String,
}

impl DocumentStore for MongoStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn collection(&self, database: &str, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(MongoCollection {
            inner: self.client.database(database).collection(name),
        })
    }
}

/// `kind = "mongodb"` source
pub struct MongoSource {
    name: String,
    store: Arc<MongoStore>,
}

impl MongoSource {
    /// Create a client for a `[sources.<name>]` entry.
    ///
    /// The driver connects lazily; an unreachable server surfaces on the
    /// first query as [`StoreError::Connection`].
    pub async fn connect(name: &str, config: &FileSourceConfig) -> Result<Self, SourceBuildError> {
        let uri = config
            .uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| SourceBuildError::Invalid {
                source_name: name.to_string(),
                reason: "'uri' is required".to_string(),
            })?;

        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| SourceBuildError::Connection {
                source_name: name.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(source = %name, database = %config.database, "Created MongoDB client");

        Ok(Self {
            name: name.to_string(),
            store: Arc::new(MongoStore {
                client,
                database: config.database.clone(),
            }),
        })
    }
}

impl Source for MongoSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        MONGODB_SOURCE_KIND
    }

    fn document_store(&self) -> Option<Arc<dyn DocumentStore>> {
        Some(self.store.clone())
    }
}
