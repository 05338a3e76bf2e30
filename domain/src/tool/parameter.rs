//! Parameter declarations for query tools.
//!
//! A [`ParameterSchema`] is the ordered list of [`Parameter`]s a tool accepts.
//! Declaration order is significant: it drives the order of manifest entries
//! and of validated [`ParamValues`](super::validation::ParamValues).

use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Errors detected while building a [`ParameterSchema`] from configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate parameter name '{0}'")]
    DuplicateParameter(String),

    #[error("parameter '{parameter}' has unknown type '{type_name}'")]
    UnknownType { parameter: String, type_name: String },

    #[error("array parameter '{0}' must declare an item type")]
    MissingItems(String),

    #[error("default value of parameter '{parameter}' is not a valid {expected}")]
    InvalidDefault { parameter: String, expected: String },
}

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Integer,
    Float,
    Boolean,
    /// Homogeneous array of scalar items
    Array(Box<ParameterType>),
}

impl ParameterType {
    /// Parse a configured type name.
    ///
    /// `items` is only consulted for `array`, where it names the element type.
    /// Nested arrays are not supported.
    pub fn parse(
        parameter: &str,
        type_name: &str,
        items: Option<&str>,
    ) -> Result<Self, SchemaError> {
        let scalar = |name: &str| match name.to_lowercase().as_str() {
            "string" => Some(ParameterType::String),
            "integer" | "int" => Some(ParameterType::Integer),
            "float" | "number" => Some(ParameterType::Float),
            "boolean" | "bool" => Some(ParameterType::Boolean),
            _ => None,
        };

        if type_name.eq_ignore_ascii_case("array") {
            let item_name = items.ok_or_else(|| SchemaError::MissingItems(parameter.to_string()))?;
            let item = scalar(item_name).ok_or_else(|| SchemaError::UnknownType {
                parameter: parameter.to_string(),
                type_name: item_name.to_string(),
            })?;
            return Ok(ParameterType::Array(Box::new(item)));
        }

        scalar(type_name).ok_or_else(|| SchemaError::UnknownType {
            parameter: parameter.to_string(),
            type_name: type_name.to_string(),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Integer => "integer",
            ParameterType::Float => "float",
            ParameterType::Boolean => "boolean",
            ParameterType::Array(_) => "array",
        }
    }

    /// JSON Schema type keyword for this parameter type.
    pub fn json_schema_type(&self) -> &'static str {
        match self {
            ParameterType::Float => "number",
            other => other.as_str(),
        }
    }

    /// Element type for arrays.
    pub fn items(&self) -> Option<&ParameterType> {
        match self {
            ParameterType::Array(item) => Some(item),
            _ => None,
        }
    }

    /// Whether `value` is an instance of this type.
    ///
    /// Integers must be integral JSON numbers; floats accept any number.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParameterType::String => value.is_string(),
            ParameterType::Integer => value.is_i64() || value.is_u64(),
            ParameterType::Float => value.is_number(),
            ParameterType::Boolean => value.is_boolean(),
            ParameterType::Array(item) => value
                .as_array()
                .is_some_and(|values| values.iter().all(|v| item.accepts(v))),
        }
    }

    /// Human-readable name used in validation messages (e.g. `array of float`).
    pub fn describe(&self) -> String {
        match self {
            ParameterType::Array(item) => format!("array of {}", item.as_str()),
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Identity claim that supplies a parameter's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamAuthService {
    /// Name of the auth service whose claims are consulted
    pub name: String,
    /// Claim field holding the value
    pub field: String,
}

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
    pub description: String,
    pub required: bool,
    /// Value used when an optional parameter is absent
    pub default: Option<Value>,
    /// When non-empty, the value comes from identity claims instead of caller input
    pub auth_services: Vec<ParamAuthService>,
}

impl Parameter {
    /// Create a required parameter with no description.
    pub fn new(name: impl Into<String>, param_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: String::new(),
            required: true,
            default: None,
            auth_services: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set a default value. A parameter with a default is never required.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self.required = false;
        self
    }

    pub fn with_auth_service(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.auth_services.push(ParamAuthService {
            name: name.into(),
            field: field.into(),
        });
        self
    }

    /// Whether the value is sourced from identity claims.
    pub fn is_claim_sourced(&self) -> bool {
        !self.auth_services.is_empty()
    }
}

/// Ordered, name-unique list of parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    parameters: Vec<Parameter>,
}

impl ParameterSchema {
    /// Build a schema, rejecting duplicate names and ill-typed defaults.
    pub fn new(parameters: Vec<Parameter>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for param in &parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(SchemaError::DuplicateParameter(param.name.clone()));
            }
            if let Some(default) = &param.default {
                if !param.param_type.accepts(default) {
                    return Err(SchemaError::InvalidDefault {
                        parameter: param.name.clone(),
                        expected: param.param_type.describe(),
                    });
                }
            }
        }
        Ok(Self { parameters })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}
