//! Parameter validation
//!
//! Applies a [`ParameterSchema`] to one invocation's raw input plus the
//! identity claims the host already verified. Pure: no I/O, and the same
//! input always yields the same [`ParamValues`] or the same error.

use super::parameter::{Parameter, ParameterSchema};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Verified identity claims, keyed by auth service name.
pub type Claims = HashMap<String, Map<String, Value>>;

/// Reasons raw input fails validation. Every variant names the parameter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required parameter '{0}'")]
    Missing(String),

    #[error("parameter '{name}' must be {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: &'static str,
    },

    #[error("unknown parameter '{0}'")]
    Unknown(String),

    #[error("parameter '{name}' requires verified claims from one of: {services}")]
    MissingClaims { name: String, services: String },
}

impl ValidationError {
    /// Name of the offending parameter
    pub fn parameter(&self) -> &str {
        match self {
            ValidationError::Missing(name)
            | ValidationError::Unknown(name)
            | ValidationError::TypeMismatch { name, .. }
            | ValidationError::MissingClaims { name, .. } => name,
        }
    }
}

/// One validated `(name, value)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamValue {
    pub name: String,
    pub value: Value,
}

/// Validated parameters for a single invocation, in declaration order.
///
/// Names are unique: inserting an existing name replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamValues {
    values: Vec<ParamValue>,
}

impl ParamValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert (used heavily in tests and by hosts that
    /// construct values directly).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.values.push(ParamValue { name, value }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mapping view (name → value), preserving declaration order.
    pub fn as_map(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }
}

/// JSON type name of a value, for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl ParameterSchema {
    /// Validate raw caller input into [`ParamValues`].
    ///
    /// The schema is closed: any key in `data` that is not declared is
    /// rejected. Claim-sourced parameters ignore caller-supplied values.
    /// An explicit JSON `null` is treated as absent.
    pub fn parse(
        &self,
        data: &Map<String, Value>,
        claims: &Claims,
    ) -> Result<ParamValues, ValidationError> {
        if let Some(unknown) = data.keys().find(|key| !self.contains(key)) {
            return Err(ValidationError::Unknown(unknown.clone()));
        }

        let mut values = ParamValues::new();
        for param in self.iter() {
            let supplied = if param.is_claim_sourced() {
                Some(claim_value(param, claims)?)
            } else {
                data.get(&param.name).filter(|v| !v.is_null()).cloned()
            };

            let value = match supplied {
                Some(value) => value,
                None => match &param.default {
                    Some(default) => default.clone(),
                    None if param.required => {
                        return Err(ValidationError::Missing(param.name.clone()));
                    }
                    None => continue,
                },
            };

            if !param.param_type.accepts(&value) {
                return Err(ValidationError::TypeMismatch {
                    name: param.name.clone(),
                    expected: param.param_type.describe(),
                    actual: json_type_name(&value),
                });
            }
            values.insert(param.name.clone(), value);
        }

        Ok(values)
    }
}

/// Look up a claim-sourced value from the first listed service that carries it.
fn claim_value(param: &Parameter, claims: &Claims) -> Result<Value, ValidationError> {
    param
        .auth_services
        .iter()
        .find_map(|service| {
            claims
                .get(&service.name)
                .and_then(|fields| fields.get(&service.field))
                .cloned()
        })
        .ok_or_else(|| ValidationError::MissingClaims {
            name: param.name.clone(),
            services: param
                .auth_services
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
}
