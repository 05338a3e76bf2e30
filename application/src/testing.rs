//! In-process test doubles for the store ports.

use crate::ports::document_store::{
    DocumentCollection, DocumentStore, DocumentStream, StoreError,
};
use crate::ports::source::Source;
use async_trait::async_trait;
use docquery_domain::QueryDocument;
use futures::StreamExt;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Find(QueryDocument),
    Aggregate(Vec<QueryDocument>),
}

#[derive(Debug, Clone)]
enum Behavior {
    Return(Vec<Value>),
    Reject(String),
    FailAfter(Vec<Value>, StoreError),
    PendingAfter(Vec<Value>),
    /// Return the received filter as the only document
    Echo,
}

/// Counts live result streams.
struct CursorGuard(Arc<AtomicUsize>);

impl CursorGuard {
    fn open(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Collection that records every request and replays a fixed behavior.
pub struct RecordingCollection {
    behavior: Behavior,
    calls: Mutex<Vec<RecordedCall>>,
    open: Arc<AtomicUsize>,
}

impl RecordingCollection {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn returning(documents: Vec<Value>) -> Self {
        Self::with_behavior(Behavior::Return(documents))
    }

    pub fn rejecting(reason: &str) -> Self {
        Self::with_behavior(Behavior::Reject(reason.to_string()))
    }

    pub fn failing_after(documents: Vec<Value>, reason: &str) -> Self {
        Self::failing_with(documents, StoreError::Cursor(reason.to_string()))
    }

    pub fn failing_with(documents: Vec<Value>, error: StoreError) -> Self {
        Self::with_behavior(Behavior::FailAfter(documents, error))
    }

    pub fn pending_after(documents: Vec<Value>) -> Self {
        Self::with_behavior(Behavior::PendingAfter(documents))
    }

    pub fn echoing() -> Self {
        Self::with_behavior(Behavior::Echo)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn open_cursors(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    fn respond(&self, call: RecordedCall) -> Result<DocumentStream, StoreError> {
        let echoed = match &call {
            RecordedCall::Find(filter) => Value::Object(filter.clone()),
            RecordedCall::Aggregate(pipeline) => Value::Array(
                pipeline.iter().cloned().map(Value::Object).collect(),
            ),
        };
        self.calls.lock().unwrap().push(call);

        let guard = CursorGuard::open(&self.open);
        let stream = match self.behavior.clone() {
            Behavior::Reject(reason) => return Err(StoreError::Rejected(reason)),
            Behavior::Return(docs) => futures::stream::iter(docs.into_iter().map(Ok)).boxed(),
            Behavior::FailAfter(docs, error) => futures::stream::iter(docs.into_iter().map(Ok))
                .chain(futures::stream::once(async move { Err(error) }))
                .boxed(),
            Behavior::PendingAfter(docs) => futures::stream::iter(docs.into_iter().map(Ok))
                .chain(futures::stream::pending())
                .boxed(),
            Behavior::Echo => futures::stream::iter(vec![Ok(echoed)]).boxed(),
        };

        Ok(stream
            .map(move |item| {
                let _cursor = &guard;
                item
            })
            .boxed())
    }
}

#[async_trait]
impl DocumentCollection for RecordingCollection {
    async fn find(&self, filter: QueryDocument) -> Result<DocumentStream, StoreError> {
        self.respond(RecordedCall::Find(filter))
    }

    async fn aggregate(&self, pipeline: Vec<QueryDocument>) -> Result<DocumentStream, StoreError> {
        self.respond(RecordedCall::Aggregate(pipeline))
    }
}

/// Store whose every collection is the same recording collection.
pub struct RecordingStore {
    database: String,
    collection: Arc<RecordingCollection>,
    namespaces: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new(database: &str, collection: RecordingCollection) -> Self {
        Self {
            database: database.to_string(),
            collection: Arc::new(collection),
            namespaces: Mutex::new(Vec::new()),
        }
    }

    pub fn collection_handle(&self) -> Arc<RecordingCollection> {
        self.collection.clone()
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces.lock().unwrap().clone()
    }
}

impl DocumentStore for RecordingStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn collection(&self, database: &str, name: &str) -> Arc<dyn DocumentCollection> {
        self.namespaces
            .lock()
            .unwrap()
            .push(format!("{database}.{name}"));
        self.collection.clone()
    }
}

/// Source wrapping an optional store.
pub struct StaticSource {
    pub name: String,
    pub kind: String,
    pub store: Option<Arc<dyn DocumentStore>>,
}

impl Source for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn document_store(&self) -> Option<Arc<dyn DocumentStore>> {
        self.store.clone()
    }
}
