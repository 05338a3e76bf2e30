//! Tool port
//!
//! The contract the host relies on for every invokable tool. The host calls
//! [`Tool::authorized`] and [`Tool::parse_params`] before [`Tool::invoke`],
//! and serves [`Tool::manifest`] / [`Tool::invocation_schema`] to clients
//! that want to introspect a tool without calling it.

use crate::ports::document_store::StoreError;
use async_trait::async_trait;
use docquery_domain::query::VectorSearchParamError;
use docquery_domain::{Claims, Document, InvocationSchema, Manifest, ParamValues, ValidationError};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors returned from a tool invocation
///
/// Nothing here is retried by the tool itself; retry policy, if any, belongs
/// to the host or the source.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Invalid parameters: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown operation kind, or a known one without an executor
    #[error("Unsupported operation '{operation}': {reason}")]
    UnsupportedOperation { operation: String, reason: String },

    #[error("Missing or invalid parameter '{name}': {reason}")]
    MissingOrInvalidParameter { name: String, reason: String },

    #[error("Unable to execute query on {namespace}: {source}")]
    QueryExecution {
        namespace: String,
        source: StoreError,
    },

    #[error("Unable to parse document from {namespace}: {reason}")]
    Decode { namespace: String, reason: String },

    #[error("Cursor error on {namespace}: {source}")]
    Cursor {
        namespace: String,
        source: StoreError,
    },

    #[error("Invocation cancelled")]
    Cancelled,
}

impl InvokeError {
    /// Whether the caller could fix this by changing its arguments
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            InvokeError::Validation(_) | InvokeError::MissingOrInvalidParameter { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, InvokeError::Cancelled)
    }
}

impl From<VectorSearchParamError> for InvokeError {
    fn from(err: VectorSearchParamError) -> Self {
        InvokeError::MissingOrInvalidParameter {
            name: err.parameter().to_string(),
            reason: err.to_string(),
        }
    }
}

/// An invokable tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name
    fn name(&self) -> &str;

    /// Execute with already-validated parameters.
    ///
    /// Must stop promptly and release any store cursor once `cancel` fires.
    async fn invoke(
        &self,
        params: ParamValues,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>, InvokeError>;

    /// Validate raw caller input plus verified identity claims
    fn parse_params(
        &self,
        data: &Map<String, Value>,
        claims: &Claims,
    ) -> Result<ParamValues, ValidationError>;

    /// Human/client-facing summary
    fn manifest(&self) -> &Manifest;

    /// Machine-readable input shape
    fn invocation_schema(&self) -> &InvocationSchema;

    /// Whether the verified auth services satisfy this tool's requirement
    fn authorized(&self, verified_auth_services: &[String]) -> bool;
}
