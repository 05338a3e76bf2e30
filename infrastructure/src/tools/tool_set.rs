//! Tool set
//!
//! The [`ToolSet`] binds every `[tools.<name>]` entry of a loaded
//! [`FileConfig`] to its source and keeps the resulting tools by name.
//!
//! # Usage
//!
//! ```ignore
//! use docquery_infrastructure::{ConfigLoader, ToolSet, CallContext};
//!
//! let config = ConfigLoader::load(None)?;
//! let (tools, errors) = ToolSet::from_config(&config).await;
//!
//! let results = tools
//!     .call("find_user", &args, &CallContext::anonymous(), &cancel)
//!     .await?;
//! ```
//!
//! # Failure Isolation
//!
//! A source or tool that fails to build is logged, reported in the returned
//! error list and left out. Every other tool stays usable.

use crate::config::FileConfig;
use crate::sources::{SourceBuildError, build_sources};
use docquery_application::{ConfigurationError, InvokeError, QueryTool, SourceMap, Tool};
use docquery_domain::{Claims, Document, InvocationSchema, Manifest};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors raised while assembling a tool set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolSetError {
    #[error(transparent)]
    Source(#[from] SourceBuildError),

    #[error("tool '{tool}': {source}")]
    Tool {
        tool: String,
        source: ConfigurationError,
    },
}

/// Errors from [`ToolSet::call`]
#[derive(Error, Debug)]
pub enum CallError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("tool '{0}' requires an auth service the caller has not verified")]
    Unauthorized(String),

    #[error(transparent)]
    Invoke(#[from] InvokeError),
}

/// Verified identity of a caller
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Auth services whose tokens the host has verified
    pub verified_auth_services: Vec<String>,
    /// Claims per verified auth service
    pub claims: Claims,
}

impl CallContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Record a verified service together with its claims.
    pub fn with_service(mut self, service: impl Into<String>, claims: Map<String, Value>) -> Self {
        let service = service.into();
        self.verified_auth_services.push(service.clone());
        self.claims.insert(service, claims);
        self
    }
}

/// Bound tools by name
#[derive(Default)]
pub struct ToolSet {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build sources, then bind every tool in `config`.
    pub async fn from_config(config: &FileConfig) -> (Self, Vec<ToolSetError>) {
        for issue in config.validate() {
            tracing::warn!(code = ?issue.code, "{}", issue);
        }

        let (sources, source_errors) = build_sources(&config.sources).await;
        let (tools, tool_errors) = Self::bind(config, &sources);

        let errors = source_errors
            .into_iter()
            .map(ToolSetError::from)
            .chain(tool_errors)
            .collect();
        (tools, errors)
    }

    /// Bind every tool in `config` against already-built sources.
    pub fn bind(config: &FileConfig, sources: &SourceMap) -> (Self, Vec<ToolSetError>) {
        let mut set = Self::new();
        let mut errors = Vec::new();

        for (name, file_tool) in &config.tools {
            let bound = file_tool
                .to_tool_config(name)
                .map_err(ConfigurationError::from)
                .and_then(|tool_config| QueryTool::bind(tool_config, sources));

            match bound {
                Ok(tool) => set = set.register(tool),
                Err(source) => {
                    tracing::warn!(tool = %name, error = %source, "Skipping tool");
                    errors.push(ToolSetError::Tool {
                        tool: name.clone(),
                        source,
                    });
                }
            }
        }

        tracing::info!(tools = set.len(), failed = errors.len(), "Tool set ready");
        (set, errors)
    }

    /// Add a tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Manifests of every tool, keyed by tool name
    pub fn manifests(&self) -> BTreeMap<String, Manifest> {
        self.tools
            .iter()
            .map(|(name, tool)| (name.clone(), tool.manifest().clone()))
            .collect()
    }

    pub fn invocation_schemas(&self) -> Vec<InvocationSchema> {
        self.tools
            .values()
            .map(|tool| tool.invocation_schema().clone())
            .collect()
    }

    /// Authorize, validate and invoke a tool in one step.
    pub async fn call(
        &self,
        name: &str,
        data: &Map<String, Value>,
        context: &CallContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>, CallError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| CallError::UnknownTool(name.to_string()))?;

        if !tool.authorized(&context.verified_auth_services) {
            tracing::debug!(tool = %name, "Rejected unauthorized call");
            return Err(CallError::Unauthorized(name.to_string()));
        }

        let params = tool
            .parse_params(data, &context.claims)
            .map_err(InvokeError::from)?;
        Ok(tool.invoke(params, cancel).await?)
    }
}
