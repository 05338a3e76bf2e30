//! Tool configuration from TOML (`[tools.<name>]` sections)
//!
//! Each entry declares one query tool: the source and collection it reads,
//! a base query template, the operation to run and the parameters callers
//! may supply. Field names follow the camelCase used by tool manifests.
//!
//! Example configuration:
//!
//! ```toml
//! [tools.find_user]
//! kind = "mongodb-atlas"
//! source = "app_db"
//! description = "Find users by name"
//! collection = "users"
//! operation = "find"
//! query = { active = true }
//! authRequired = ["google"]
//!
//! [[tools.find_user.parameters]]
//! name = "name"
//! type = "string"
//! description = "User name"
//!
//! [[tools.find_user.parameters]]
//! name = "email"
//! type = "string"
//! description = "Caller email"
//! authServices = [{ name = "google", field = "email" }]
//! ```

use docquery_domain::{
    Operation, Parameter, ParameterSchema, ParameterType, QueryDocument, QueryToolConfig,
    SchemaError, VectorSearchTuning,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Claim source for a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileParamAuthService {
    /// Auth service that verified the caller
    pub name: String,
    /// Claim field holding the value
    pub field: String,
}

/// A single `[[tools.<name>.parameters]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileParameterConfig {
    pub name: String,
    /// Parameter type: "string", "integer", "float", "boolean", "array"
    #[serde(rename = "type", default = "default_string_type")]
    pub param_type: String,
    #[serde(default)]
    pub description: String,
    /// Whether this parameter is required (default: true, false when a default is set)
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    /// Element type for arrays
    #[serde(default)]
    pub items: Option<String>,
    #[serde(default)]
    pub auth_services: Vec<FileParamAuthService>,
}

fn default_string_type() -> String {
    "string".to_string()
}

fn default_true() -> bool {
    true
}

impl FileParameterConfig {
    pub fn to_parameter(&self) -> Result<Parameter, SchemaError> {
        let param_type =
            ParameterType::parse(&self.name, &self.param_type, self.items.as_deref())?;

        let mut parameter =
            Parameter::new(self.name.as_str(), param_type).with_description(self.description.as_str());
        if !self.required {
            parameter = parameter.optional();
        }
        if let Some(default) = &self.default {
            parameter = parameter.with_default(default.clone());
        }
        for service in &self.auth_services {
            parameter = parameter.with_auth_service(service.name.as_str(), service.field.as_str());
        }
        Ok(parameter)
    }
}

/// `[tools.<name>.vectorSearch]` tuning overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVectorSearchConfig {
    pub num_candidates: Option<u32>,
    pub limit: Option<u32>,
}

impl FileVectorSearchConfig {
    pub fn to_tuning(&self) -> VectorSearchTuning {
        let defaults = VectorSearchTuning::default();
        VectorSearchTuning {
            num_candidates: self.num_candidates.unwrap_or(defaults.num_candidates),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

/// A single `[tools.<name>]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileToolConfig {
    /// Tool kind tag, must be "mongodb-atlas"
    pub kind: String,
    /// Name of the `[sources.<name>]` entry to bind to
    pub source: String,
    #[serde(default)]
    pub description: String,
    pub collection: String,
    /// "find" (default), "aggregate" or "vectorSearch"
    #[serde(default)]
    pub operation: Option<String>,
    /// Base query template
    #[serde(default)]
    pub query: QueryDocument,
    #[serde(default)]
    pub auth_required: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<FileParameterConfig>,
    /// Raw request-body template, carried through unparsed
    #[serde(default)]
    pub request_body: Option<String>,
    #[serde(default)]
    pub vector_search: Option<FileVectorSearchConfig>,
}

impl FileToolConfig {
    pub fn parse_operation(&self) -> Operation {
        self.operation
            .as_deref()
            .map(Operation::parse)
            .unwrap_or_default()
    }

    /// Build the domain configuration for the tool called `name`.
    pub fn to_tool_config(&self, name: &str) -> Result<QueryToolConfig, SchemaError> {
        let parameters = self
            .parameters
            .iter()
            .map(FileParameterConfig::to_parameter)
            .collect::<Result<Vec<_>, _>>()?;

        let mut config = QueryToolConfig::new(name, self.source.as_str(), self.collection.as_str())
            .with_description(self.description.as_str())
            .with_operation(self.parse_operation())
            .with_query(self.query.clone())
            .with_auth_required(self.auth_required.clone())
            .with_parameters(ParameterSchema::new(parameters)?);
        config.kind = self.kind.clone();

        if let Some(body) = &self.request_body {
            config = config.with_request_body(body.as_str());
        }
        if let Some(tuning) = &self.vector_search {
            config = config.with_vector_search(tuning.to_tuning());
        }
        Ok(config)
    }
}
