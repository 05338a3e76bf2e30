//! Query tool use case.
//!
//! Binds a declarative [`QueryToolConfig`] to a live document store and
//! exposes it through the [`Tool`] port.
//!
//! Binding happens once per configuration entry at startup:
//!
//! 1. Check the kind tag
//! 2. Resolve the named source and require a document store from it
//! 3. Precompute the [`Manifest`] and [`InvocationSchema`]
//!
//! Each invocation then runs [`OperationDispatcher`] against a fresh copy of
//! the stored query template, so concurrent calls on the same tool never see
//! each other's parameters.

use super::dispatch::OperationDispatcher;
use crate::ports::document_store::DocumentStore;
use crate::ports::source::SourceMap;
use crate::ports::tool::{InvokeError, Tool};
use async_trait::async_trait;
use docquery_domain::{
    Claims, Document, InvocationSchema, Manifest, Operation, ParamValues, QUERY_TOOL_KIND,
    QueryToolConfig, SchemaError, ValidationError, is_authorized,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Errors detected while binding a tool to its source.
///
/// Fatal for that one tool only; the host keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no source named '{source_name}' configured for tool '{tool}'")]
    UnknownSource { tool: String, source_name: String },

    #[error("source '{source_name}' of kind '{kind}' is not a document store, required by tool '{tool}'")]
    IncompatibleSource {
        tool: String,
        source_name: String,
        kind: String,
    },

    #[error("tool '{tool}' has kind '{kind}', expected '{expected}'")]
    InvalidKind {
        tool: String,
        kind: String,
        expected: &'static str,
    },

    #[error("invalid parameter schema: {0}")]
    Parameters(#[from] SchemaError),
}

/// A query tool bound to a document store.
pub struct QueryTool {
    config: QueryToolConfig,
    store: Arc<dyn DocumentStore>,
    database: String,
    manifest: Manifest,
    invocation_schema: InvocationSchema,
}

impl std::fmt::Debug for QueryTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryTool")
            .field("name", &self.config.name)
            .field("namespace", &self.namespace())
            .field("operation", &self.config.operation)
            .finish()
    }
}

impl QueryTool {
    /// Bind a configuration to its source.
    pub fn bind(config: QueryToolConfig, sources: &SourceMap) -> Result<Self, ConfigurationError> {
        if config.kind != QUERY_TOOL_KIND {
            return Err(ConfigurationError::InvalidKind {
                tool: config.name.clone(),
                kind: config.kind.clone(),
                expected: QUERY_TOOL_KIND,
            });
        }

        let source = sources
            .get(&config.source)
            .ok_or_else(|| ConfigurationError::UnknownSource {
                tool: config.name.clone(),
                source_name: config.source.clone(),
            })?;

        let store = source
            .document_store()
            .ok_or_else(|| ConfigurationError::IncompatibleSource {
                tool: config.name.clone(),
                source_name: config.source.clone(),
                kind: source.kind().to_string(),
            })?;

        if let Operation::Unsupported(kind) = &config.operation {
            warn!(
                tool = %config.name,
                operation = %kind,
                "Tool configured with an unsupported operation; every call will fail"
            );
        }

        let manifest = Manifest::project(
            config.description.as_str(),
            &config.parameters,
            &config.auth_required,
        );
        let invocation_schema = InvocationSchema::project(
            config.name.as_str(),
            config.description.as_str(),
            &config.parameters,
        );
        let database = store.database_name().to_string();

        info!(
            tool = %config.name,
            source = %config.source,
            namespace = %format!("{}.{}", database, config.collection),
            operation = %config.operation,
            "Bound query tool"
        );

        Ok(Self {
            config,
            store,
            database,
            manifest,
            invocation_schema,
        })
    }

    pub fn config(&self) -> &QueryToolConfig {
        &self.config
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// `database.collection`
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.config.collection)
    }
}

#[async_trait]
impl Tool for QueryTool {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn invoke(
        &self,
        params: ParamValues,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>, InvokeError> {
        debug!(
            tool = %self.config.name,
            operation = %self.config.operation,
            params = params.len(),
            "Invoking query tool"
        );

        let namespace = self.namespace();
        let collection = self
            .store
            .collection(&self.database, &self.config.collection);

        OperationDispatcher::new(&self.config.name, &namespace, collection.as_ref(), cancel)
            .dispatch(
                &self.config.operation,
                &self.config.query,
                &params,
                self.config.vector_search,
            )
            .await
    }

    fn parse_params(
        &self,
        data: &Map<String, Value>,
        claims: &Claims,
    ) -> Result<ParamValues, ValidationError> {
        self.config.parameters.parse(data, claims)
    }

    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn invocation_schema(&self) -> &InvocationSchema {
        &self.invocation_schema
    }

    fn authorized(&self, verified_auth_services: &[String]) -> bool {
        is_authorized(&self.config.auth_required, verified_auth_services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::source::Source;
    use crate::testing::{RecordedCall, RecordingCollection, RecordingStore, StaticSource};
    use docquery_domain::query::pipeline::{INDEX_NAME_PARAM, PATH_PARAM, QUERY_VECTOR_PARAM};
    use docquery_domain::{Parameter, ParameterSchema, ParameterType};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn sources_with(store: Arc<RecordingStore>) -> SourceMap {
        let mut sources = SourceMap::new();
        let source: Arc<dyn Source> = Arc::new(StaticSource {
            name: "app_db".to_string(),
            kind: "memory".to_string(),
            store: Some(store as Arc<dyn DocumentStore>),
        });
        sources.insert("app_db".to_string(), source);
        sources
    }

    fn find_config() -> QueryToolConfig {
        QueryToolConfig::new("find_user", "app_db", "users")
            .with_description("Find a user")
            .with_query(doc(json!({"active": true, "_id": 0})))
            .with_parameters(
                ParameterSchema::new(vec![Parameter::new("_id", ParameterType::Integer)]).unwrap(),
            )
    }

    fn bind_echoing(config: QueryToolConfig) -> (QueryTool, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::new("app", RecordingCollection::echoing()));
        let tool = QueryTool::bind(config, &sources_with(store.clone())).unwrap();
        (tool, store)
    }

    #[test]
    fn test_bind_unknown_source() {
        let err = QueryTool::bind(find_config(), &SourceMap::new()).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownSource {
                tool: "find_user".to_string(),
                source_name: "app_db".to_string(),
            }
        );
    }

    #[test]
    fn test_bind_incompatible_source() {
        let mut sources = SourceMap::new();
        let source: Arc<dyn Source> = Arc::new(StaticSource {
            name: "app_db".to_string(),
            kind: "http".to_string(),
            store: None,
        });
        sources.insert("app_db".to_string(), source);

        let err = QueryTool::bind(find_config(), &sources).unwrap_err();
        assert!(matches!(err, ConfigurationError::IncompatibleSource { ref kind, .. } if kind == "http"));
    }

    #[test]
    fn test_bind_invalid_kind() {
        let mut config = find_config();
        config.kind = "postgres-sql".to_string();
        let (_, store) = bind_echoing(find_config());
        let err = QueryTool::bind(config, &sources_with(store)).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidKind { .. }));
    }

    #[test]
    fn test_bind_precomputes_projections() {
        let (tool, _) = bind_echoing(find_config().with_auth_required(vec!["sso".to_string()]));

        assert_eq!(tool.name(), "find_user");
        assert_eq!(tool.database(), "app");
        assert_eq!(tool.namespace(), "app.users");
        assert_eq!(tool.manifest().description, "Find a user");
        assert_eq!(tool.manifest().auth_required, vec!["sso"]);
        assert_eq!(tool.invocation_schema().name, "find_user");
        assert_eq!(
            tool.invocation_schema().input_schema["properties"]["_id"]["type"],
            "integer"
        );
    }

    #[test]
    fn test_authorized() {
        let (open, _) = bind_echoing(find_config());
        assert!(open.authorized(&[]));

        let (guarded, _) = bind_echoing(
            find_config().with_auth_required(vec!["google".to_string(), "github".to_string()]),
        );
        assert!(!guarded.authorized(&[]));
        assert!(guarded.authorized(&["github".to_string()]));
        assert!(!guarded.authorized(&["gitlab".to_string()]));
    }

    #[tokio::test]
    async fn test_parse_then_invoke() {
        let (tool, store) = bind_echoing(find_config());
        let params = tool
            .parse_params(&doc(json!({"_id": 7})), &Claims::new())
            .unwrap();

        let results = tool.invoke(params, &CancellationToken::new()).await.unwrap();
        assert_eq!(results, vec![doc(json!({"active": true, "_id": 7}))]);
        assert_eq!(store.namespaces(), vec!["app.users"]);
    }

    #[tokio::test]
    async fn test_template_not_mutated_across_invocations() {
        let (tool, _) = bind_echoing(find_config());
        let cancel = CancellationToken::new();

        let first = tool
            .invoke(ParamValues::new().with("_id", 1), &cancel)
            .await
            .unwrap();
        let second = tool
            .invoke(ParamValues::new().with("_id", 2), &cancel)
            .await
            .unwrap();

        assert_eq!(first, vec![doc(json!({"active": true, "_id": 1}))]);
        assert_eq!(second, vec![doc(json!({"active": true, "_id": 2}))]);
        assert_eq!(tool.config().query, doc(json!({"active": true, "_id": 0})));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invocations_are_isolated() {
        let (tool, store) = bind_echoing(find_config());
        let tool = Arc::new(tool);

        let mut handles = Vec::new();
        for i in 0..64 {
            let tool = tool.clone();
            let id = 1 + (i % 2);
            handles.push(tokio::spawn(async move {
                let results = tool
                    .invoke(ParamValues::new().with("_id", id), &CancellationToken::new())
                    .await
                    .unwrap();
                (id, results)
            }));
        }

        for handle in handles {
            let (id, results) = handle.await.unwrap();
            assert_eq!(results, vec![doc(json!({"active": true, "_id": id}))]);
        }

        let filters: Vec<_> = store
            .collection_handle()
            .calls()
            .into_iter()
            .map(|call| match call {
                RecordedCall::Find(filter) => filter,
                other => panic!("unexpected call: {other:?}"),
            })
            .collect();
        assert_eq!(filters.len(), 64);
        assert!(filters.iter().all(|f| f["active"] == json!(true)));
    }

    #[tokio::test]
    async fn test_vector_search_without_index_name_skips_store() {
        let config = QueryToolConfig::new("similar", "app_db", "docs")
            .with_operation(Operation::VectorSearch)
            .with_parameters(
                ParameterSchema::new(vec![
                    Parameter::new(INDEX_NAME_PARAM, ParameterType::String).optional(),
                    Parameter::new(
                        QUERY_VECTOR_PARAM,
                        ParameterType::Array(Box::new(ParameterType::Float)),
                    ),
                    Parameter::new(PATH_PARAM, ParameterType::String),
                ])
                .unwrap(),
            );
        let (tool, store) = bind_echoing(config);

        let params = tool
            .parse_params(
                &doc(json!({"queryVector": [0.1, 0.2], "path": "embedding"})),
                &Claims::new(),
            )
            .unwrap();
        let err = tool
            .invoke(params, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("indexName"));
        assert!(store.collection_handle().calls().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_operation_binds_but_fails() {
        let (tool, _) = bind_echoing(find_config().with_operation(Operation::parse("update")));
        let err = tool
            .invoke(ParamValues::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InvokeError::UnsupportedOperation { ref operation, .. } if operation == "update"
        ));
    }
}
