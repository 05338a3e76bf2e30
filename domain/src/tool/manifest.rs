//! Manifest projection
//!
//! Two read-only views of a tool's input contract:
//!
//! - [`Manifest`]: description, parameter summaries and auth requirements,
//!   for humans and client UIs
//! - [`InvocationSchema`]: a JSON Schema input shape, for remote callers and
//!   LLM agents that need to build a syntactically valid call
//!
//! Both are pure functions of the parameter schema and declared metadata.
//! Tools compute them once when bound.

use super::parameter::{Parameter, ParameterSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Summary of a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterManifest {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auth_sources: Vec<String>,
}

impl From<&Parameter> for ParameterManifest {
    fn from(param: &Parameter) -> Self {
        Self {
            name: param.name.clone(),
            param_type: param.param_type.as_str().to_string(),
            description: param.description.clone(),
            required: param.required,
            items: param.param_type.items().map(|i| i.as_str().to_string()),
            auth_sources: param.auth_services.iter().map(|s| s.name.clone()).collect(),
        }
    }
}

/// Human/client-facing summary of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub description: String,
    pub parameters: Vec<ParameterManifest>,
    pub auth_required: Vec<String>,
}

impl Manifest {
    pub fn project(
        description: impl Into<String>,
        schema: &ParameterSchema,
        auth_required: &[String],
    ) -> Self {
        Self {
            description: description.into(),
            parameters: schema.iter().map(ParameterManifest::from).collect(),
            auth_required: auth_required.to_vec(),
        }
    }
}

/// Machine-readable input shape of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl InvocationSchema {
    pub fn project(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: &ParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: input_schema(schema),
        }
    }
}

/// Build a JSON Schema `object` describing caller-suppliable parameters.
///
/// Claim-sourced parameters are omitted: callers cannot set them. Parameters
/// with defaults are never listed as required.
pub fn input_schema(schema: &ParameterSchema) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in schema.iter().filter(|p| !p.is_claim_sourced()) {
        let mut prop = Map::new();
        prop.insert("type".to_string(), json!(param.param_type.json_schema_type()));
        prop.insert("description".to_string(), json!(param.description));
        if let Some(item) = param.param_type.items() {
            prop.insert("items".to_string(), json!({ "type": item.json_schema_type() }));
        }
        if let Some(default) = &param.default {
            prop.insert("default".to_string(), default.clone());
        }
        properties.insert(param.name.clone(), Value::Object(prop));

        if param.required {
            required.push(json!(param.name));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
