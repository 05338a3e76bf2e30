//! Tool domain module
//!
//! A query tool turns a declarative [`QueryToolConfig`] into a callable unit.
//! This module holds the pure pieces of that contract:
//!
//! ```text
//! ┌──────────────────┐   parse    ┌──────────────┐  overlay   ┌───────────────┐
//! │ ParameterSchema  │──────────▶│ ParamValues  │──────────▶│ QueryDocument │
//! │ (declared)       │  + claims  │ (validated)  │ + template │ (per call)    │
//! └────────┬─────────┘            └──────────────┘            └───────────────┘
//!          │ project
//!          ├─▶ Manifest          (humans, client UIs)
//!          └─▶ InvocationSchema  (JSON Schema for remote callers)
//! ```
//!
//! # Key Types
//!
//! - [`QueryToolConfig`]: declarative description, immutable after load
//! - [`Operation`]: closed set of operations (find / aggregate / vectorSearch)
//! - [`ParameterSchema`] / [`Parameter`]: ordered parameter declarations
//! - [`ParamValues`]: validated values for one invocation
//! - [`Manifest`] / [`InvocationSchema`]: read-only projections
//! - [`is_authorized`]: the auth-service gate
//!
//! Execution against a backing store lives in the application layer.

pub mod auth;
pub mod entities;
pub mod manifest;
pub mod parameter;
pub mod validation;

pub use auth::is_authorized;
pub use entities::{Operation, QUERY_TOOL_KIND, QueryToolConfig, VectorSearchTuning};
pub use manifest::{InvocationSchema, Manifest, ParameterManifest};
pub use parameter::{ParamAuthService, Parameter, ParameterSchema, ParameterType, SchemaError};
pub use validation::{Claims, ParamValue, ParamValues, ValidationError};
