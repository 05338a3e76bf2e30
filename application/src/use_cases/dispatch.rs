//! Operation dispatch
//!
//! Turns a bound query into a store request and shapes the raw results.
//! The configured [`Operation`] selects exactly one branch per call:
//!
//! | Operation | Store call | Result shaping |
//! |-----------|------------|----------------|
//! | `find` | `find(overlay)` | documents as delivered |
//! | `aggregate` | none | always `UnsupportedOperation` |
//! | `vectorSearch` | `aggregate([$match?, $vectorSearch])` | embedding field removed |
//! | other | none | `UnsupportedOperation` naming the kind |
//!
//! Every store wait races against the caller's cancellation token. The
//! result stream is owned here and dropped on every exit path, which
//! releases the store cursor.

use crate::ports::document_store::{DocumentCollection, DocumentStream, StoreError};
use crate::ports::tool::InvokeError;
use docquery_domain::query::{VectorSearchRequest, overlay, parameter_stages, remove_path};
use docquery_domain::{Document, Operation, ParamValues, QueryDocument, VectorSearchTuning};
use futures::StreamExt;
use serde_json::Value;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Executes one invocation against one collection.
pub struct OperationDispatcher<'a> {
    tool: &'a str,
    namespace: &'a str,
    collection: &'a dyn DocumentCollection,
    cancel: &'a CancellationToken,
}

impl<'a> OperationDispatcher<'a> {
    pub fn new(
        tool: &'a str,
        namespace: &'a str,
        collection: &'a dyn DocumentCollection,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            tool,
            namespace,
            collection,
            cancel,
        }
    }

    /// Run the branch selected by `operation`.
    ///
    /// `template` is only read; each branch works on its own copy.
    pub async fn dispatch(
        &self,
        operation: &Operation,
        template: &QueryDocument,
        params: &ParamValues,
        tuning: VectorSearchTuning,
    ) -> Result<Vec<Document>, InvokeError> {
        match operation {
            Operation::Find => self.find(overlay(template, params)).await,
            Operation::Aggregate => self.aggregate(template, params),
            Operation::VectorSearch => self.vector_search(template, params, tuning).await,
            Operation::Unsupported(kind) => Err(InvokeError::UnsupportedOperation {
                operation: kind.clone(),
                reason: "unknown operation kind".to_string(),
            }),
        }
    }

    async fn find(&self, filter: QueryDocument) -> Result<Vec<Document>, InvokeError> {
        debug!(tool = %self.tool, namespace = %self.namespace, ?filter, "Running find");
        let stream = self.open(self.collection.find(filter)).await?;
        self.drain(stream, None).await
    }

    /// Builds the staged pipeline, then refuses to run it.
    fn aggregate(
        &self,
        template: &QueryDocument,
        params: &ParamValues,
    ) -> Result<Vec<Document>, InvokeError> {
        let filter = overlay(template, params);
        let pipeline = parameter_stages(params);
        debug!(
            tool = %self.tool,
            namespace = %self.namespace,
            ?filter,
            ?pipeline,
            "Constructed aggregate pipeline"
        );
        Err(InvokeError::UnsupportedOperation {
            operation: Operation::Aggregate.to_string(),
            reason: "not implemented".to_string(),
        })
    }

    async fn vector_search(
        &self,
        template: &QueryDocument,
        params: &ParamValues,
        tuning: VectorSearchTuning,
    ) -> Result<Vec<Document>, InvokeError> {
        let request = VectorSearchRequest::from_params(template, params, tuning)?;
        let pipeline = request.pipeline();
        debug!(
            tool = %self.tool,
            namespace = %self.namespace,
            index = %request.index,
            path = %request.path,
            stages = pipeline.len(),
            "Running vector search"
        );
        let stream = self.open(self.collection.aggregate(pipeline)).await?;
        self.drain(stream, Some(&request.path)).await
    }

    /// Await the store call unless cancelled first.
    async fn open<F>(&self, request: F) -> Result<DocumentStream, InvokeError>
    where
        F: Future<Output = Result<DocumentStream, StoreError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(InvokeError::Cancelled),
            result = request => result.map_err(|source| InvokeError::QueryExecution {
                namespace: self.namespace.to_string(),
                source,
            }),
        }
    }

    /// Read the stream to exhaustion, decoding each item into a document.
    ///
    /// When `strip` is set, that field path is removed from every document.
    async fn drain(
        &self,
        mut stream: DocumentStream,
        strip: Option<&str>,
    ) -> Result<Vec<Document>, InvokeError> {
        let mut results = Vec::new();
        loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(InvokeError::Cancelled),
                item = stream.next() => item,
            };

            match item {
                None => break,
                Some(Err(StoreError::Decode(reason))) => {
                    return Err(InvokeError::Decode {
                        namespace: self.namespace.to_string(),
                        reason,
                    });
                }
                Some(Err(source)) => {
                    return Err(InvokeError::Cursor {
                        namespace: self.namespace.to_string(),
                        source,
                    });
                }
                Some(Ok(Value::Object(mut document))) => {
                    if let Some(path) = strip {
                        remove_path(&mut document, path);
                    }
                    results.push(document);
                }
                Some(Ok(other)) => {
                    return Err(InvokeError::Decode {
                        namespace: self.namespace.to_string(),
                        reason: format!("expected a document, got {}", json_kind(&other)),
                    });
                }
            }
        }
        debug!(tool = %self.tool, count = results.len(), "Read documents");
        Ok(results)
    }
}

fn json_kind(value: &Value) -> &'static str {
    docquery_domain::tool::validation::json_type_name(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordedCall, RecordingCollection};
    use docquery_domain::query::pipeline::{
        INDEX_NAME_PARAM, MATCH_STAGE, PATH_PARAM, QUERY_VECTOR_PARAM, VECTOR_SEARCH_STAGE,
    };
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn run(
        collection: &RecordingCollection,
        operation: Operation,
        template: &QueryDocument,
        params: &ParamValues,
    ) -> Result<Vec<Document>, InvokeError> {
        let cancel = CancellationToken::new();
        OperationDispatcher::new("tool", "app.items", collection, &cancel)
            .dispatch(&operation, template, params, VectorSearchTuning::default())
            .await
    }

    fn vector_params() -> ParamValues {
        ParamValues::new()
            .with(INDEX_NAME_PARAM, "vec_idx")
            .with(QUERY_VECTOR_PARAM, json!([0.1, 0.2, 0.3]))
            .with(PATH_PARAM, "embedding")
    }

    #[tokio::test]
    async fn test_find_preserves_order() {
        let collection = RecordingCollection::returning(vec![
            json!({"_id": 2}),
            json!({"_id": 1}),
            json!({"_id": 3}),
        ]);
        let template = doc(json!({"active": true}));
        let params = ParamValues::new().with("name", "Alice");

        let results = run(&collection, Operation::Find, &template, &params)
            .await
            .unwrap();

        let ids: Vec<_> = results.iter().map(|d| d["_id"].clone()).collect();
        assert_eq!(ids, vec![json!(2), json!(1), json!(3)]);
        assert_eq!(
            collection.calls(),
            vec![RecordedCall::Find(doc(json!({"active": true, "name": "Alice"})))]
        );
    }

    #[tokio::test]
    async fn test_find_empty_collection_is_ok() {
        let collection = RecordingCollection::returning(vec![]);
        let results = run(
            &collection,
            Operation::Find,
            &QueryDocument::new(),
            &ParamValues::new(),
        )
        .await
        .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_find_rejected_filter() {
        let collection = RecordingCollection::rejecting("bad operator");
        let err = run(
            &collection,
            Operation::Find,
            &QueryDocument::new(),
            &ParamValues::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, InvokeError::QueryExecution { .. }));
        assert!(err.to_string().contains("app.items"));
    }

    #[tokio::test]
    async fn test_find_decode_error() {
        let collection = RecordingCollection::returning(vec![json!({"_id": 1}), json!("oops")]);
        let err = run(
            &collection,
            Operation::Find,
            &QueryDocument::new(),
            &ParamValues::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, InvokeError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_find_store_decode_error() {
        let collection = RecordingCollection::failing_with(
            vec![json!({"_id": 1})],
            StoreError::Decode("invalid utf-8 in field 'name'".to_string()),
        );
        let err = run(
            &collection,
            Operation::Find,
            &QueryDocument::new(),
            &ParamValues::new(),
        )
        .await
        .unwrap_err();
        match err {
            InvokeError::Decode { namespace, reason } => {
                assert_eq!(namespace, "app.items");
                assert!(reason.contains("invalid utf-8"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(collection.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_find_cursor_error() {
        let collection = RecordingCollection::failing_after(vec![json!({"_id": 1})], "connection reset");
        let err = run(
            &collection,
            Operation::Find,
            &QueryDocument::new(),
            &ParamValues::new(),
        )
        .await
        .unwrap_err();
        match err {
            InvokeError::Cursor { source, .. } => {
                assert_eq!(source, StoreError::Cursor("connection reset".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_aggregate_is_not_implemented() {
        let collection = RecordingCollection::returning(vec![json!({"_id": 1})]);
        for params in [ParamValues::new(), ParamValues::new().with("$limit", 1)] {
            let err = run(&collection, Operation::Aggregate, &QueryDocument::new(), &params)
                .await
                .unwrap_err();
            assert!(matches!(err, InvokeError::UnsupportedOperation { .. }));
            assert!(err.to_string().contains("not implemented"));
        }
        assert!(collection.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_operation_names_kind() {
        let collection = RecordingCollection::returning(vec![]);
        let err = run(
            &collection,
            Operation::parse("update"),
            &QueryDocument::new(),
            &ParamValues::new(),
        )
        .await
        .unwrap_err();
        match &err {
            InvokeError::UnsupportedOperation { operation, .. } => assert_eq!(operation, "update"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("update"));
        assert!(collection.calls().is_empty());
    }

    #[tokio::test]
    async fn test_vector_search_missing_index_name() {
        let collection = RecordingCollection::returning(vec![]);
        let params = ParamValues::new()
            .with(QUERY_VECTOR_PARAM, json!([0.1]))
            .with(PATH_PARAM, "embedding");

        let err = run(
            &collection,
            Operation::VectorSearch,
            &QueryDocument::new(),
            &params,
        )
        .await
        .unwrap_err();

        match &err {
            InvokeError::MissingOrInvalidParameter { name, .. } => assert_eq!(name, "indexName"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(collection.calls().is_empty());
    }

    #[tokio::test]
    async fn test_vector_search_pipeline_and_stripping() {
        let collection = RecordingCollection::returning(vec![
            json!({"_id": 1, "title": "a", "embedding": [0.1, 0.2, 0.3]}),
            json!({"_id": 2, "title": "b", "embedding": [0.3, 0.2, 0.1]}),
        ]);

        let results = run(
            &collection,
            Operation::VectorSearch,
            &QueryDocument::new(),
            &vector_params(),
        )
        .await
        .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|d| !d.contains_key("embedding")));
        assert_eq!(results[0]["title"], "a");

        let calls = collection.calls();
        let RecordedCall::Aggregate(pipeline) = &calls[0] else {
            panic!("expected an aggregate call, got {calls:?}");
        };
        let last = &pipeline.last().unwrap()[VECTOR_SEARCH_STAGE];
        assert_eq!(last["index"], "vec_idx");
        assert_eq!(last["path"], "embedding");
        assert_eq!(last["numCandidates"], 10);
        assert_eq!(last["limit"], 10);
    }

    #[tokio::test]
    async fn test_vector_search_prefilter_stage() {
        let collection = RecordingCollection::returning(vec![]);
        let template = doc(json!({"published": true}));

        run(
            &collection,
            Operation::VectorSearch,
            &template,
            &vector_params().with("genre", "jazz"),
        )
        .await
        .unwrap();

        let calls = collection.calls();
        let RecordedCall::Aggregate(pipeline) = &calls[0] else {
            panic!("expected an aggregate call, got {calls:?}");
        };
        assert_eq!(pipeline.len(), 2);
        assert_eq!(
            pipeline[0][MATCH_STAGE],
            json!({"published": true, "genre": "jazz"})
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_store_call() {
        let collection = RecordingCollection::returning(vec![json!({"_id": 1})]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = OperationDispatcher::new("tool", "app.items", &collection, &cancel)
            .dispatch(
                &Operation::Find,
                &QueryDocument::new(),
                &ParamValues::new(),
                VectorSearchTuning::default(),
            )
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_while_streaming_releases_cursor() {
        let collection = RecordingCollection::pending_after(vec![json!({"_id": 1})]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let operation = Operation::Find;
        let template = QueryDocument::new();
        let params = ParamValues::new();

        let dispatcher = OperationDispatcher::new("tool", "app.items", &collection, &cancel);
        let (result, ()) = tokio::join!(
            dispatcher.dispatch(&operation, &template, &params, VectorSearchTuning::default()),
            async move {
                tokio::task::yield_now().await;
                trigger.cancel();
            }
        );

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(collection.open_cursors(), 0);
    }
}
