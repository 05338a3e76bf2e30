//! In-memory document store source
//!
//! Holds seed documents from the config file and answers `find` and
//! `aggregate` requests by scanning them. Useful for local development,
//! demos and tests; it has no persistence and no indexes.

use super::matcher::{matches, run_pipeline};
use crate::config::FileSourceConfig;
use async_trait::async_trait;
use docquery_application::{
    DocumentCollection, DocumentStore, DocumentStream, Source, StoreError,
};
use docquery_domain::{Document, QueryDocument};
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Kind tag of [`MemorySource`]
pub const MEMORY_SOURCE_KIND: &str = "memory";

/// Immutable snapshot of one collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    documents: Arc<Vec<Document>>,
}

impl MemoryCollection {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: Arc::new(documents),
        }
    }
}

fn into_stream(documents: Vec<Document>) -> DocumentStream {
    futures::stream::iter(documents.into_iter().map(|d| Ok(Value::Object(d)))).boxed()
}

#[async_trait]
impl DocumentCollection for MemoryCollection {
    async fn find(&self, filter: QueryDocument) -> Result<DocumentStream, StoreError> {
        let mut found = Vec::new();
        for document in self.documents.iter() {
            if matches(document, &filter)? {
                found.push(document.clone());
            }
        }
        Ok(into_stream(found))
    }

    async fn aggregate(&self, pipeline: Vec<QueryDocument>) -> Result<DocumentStream, StoreError> {
        let results = run_pipeline(self.documents.as_ref().clone(), &pipeline)?;
        Ok(into_stream(results))
    }
}

/// Store scoped to a single database.
///
/// Unknown collections, and collections requested under another database
/// name, read as empty.
#[derive(Debug, Default)]
pub struct MemoryStore {
    database: String,
    collections: HashMap<String, Arc<MemoryCollection>>,
}

impl MemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: HashMap::new(),
        }
    }

    pub fn with_collection(mut self, name: impl Into<String>, documents: Vec<Document>) -> Self {
        self.collections
            .insert(name.into(), Arc::new(MemoryCollection::new(documents)));
        self
    }
}

impl DocumentStore for MemoryStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn collection(&self, database: &str, name: &str) -> Arc<dyn DocumentCollection> {
        match self.collections.get(name) {
            Some(collection) if database == self.database => collection.clone(),
            _ => Arc::new(MemoryCollection::default()),
        }
    }
}

/// `kind = "memory"` source
#[derive(Debug)]
pub struct MemorySource {
    name: String,
    store: Arc<MemoryStore>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, store: MemoryStore) -> Self {
        Self {
            name: name.into(),
            store: Arc::new(store),
        }
    }

    /// Build from a `[sources.<name>]` entry, seeding its collections.
    pub fn from_config(name: &str, config: &FileSourceConfig) -> Self {
        let store = config
            .collections
            .iter()
            .fold(MemoryStore::new(config.database.as_str()), |store, (collection, docs)| {
                store.with_collection(collection.as_str(), docs.clone())
            });
        tracing::debug!(
            source = %name,
            database = %config.database,
            collections = config.collections.len(),
            "Built memory source"
        );
        Self::new(name, store)
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        MEMORY_SOURCE_KIND
    }

    fn document_store(&self) -> Option<Arc<dyn DocumentStore>> {
        Some(self.store.clone())
    }
}
