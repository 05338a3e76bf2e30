//! Query tool domain entities

use super::parameter::{ParameterSchema, ParameterType};
use crate::config::validation::{ConfigIssue, ConfigIssueCode, Severity};
use crate::query::document::QueryDocument;
use crate::query::pipeline::{
    DEFAULT_LIMIT, DEFAULT_NUM_CANDIDATES, INDEX_NAME_PARAM, PATH_PARAM, QUERY_VECTOR_PARAM,
};

/// Kind tag identifying document query tools in configuration.
pub const QUERY_TOOL_KIND: &str = "mongodb-atlas";

/// Operation a query tool performs against its collection.
///
/// Unrecognized configured kinds are kept verbatim in [`Operation::Unsupported`]
/// so that dispatch can report exactly what was configured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Operation {
    /// Filter read
    #[default]
    Find,
    /// Staged aggregation pipeline (not executed yet)
    Aggregate,
    /// Vector similarity search
    VectorSearch,
    /// Anything else
    Unsupported(String),
}

impl Operation {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "find" => Operation::Find,
            "aggregate" => Operation::Aggregate,
            "vectorSearch" => Operation::VectorSearch,
            other => Operation::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Operation::Find => "find",
            Operation::Aggregate => "aggregate",
            Operation::VectorSearch => "vectorSearch",
            Operation::Unsupported(kind) => kind,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tuning constants for the similarity-search stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorSearchTuning {
    /// Size of the candidate pool considered by the index
    pub num_candidates: u32,
    /// Maximum number of documents returned
    pub limit: u32,
}

impl Default for VectorSearchTuning {
    fn default() -> Self {
        Self {
            num_candidates: DEFAULT_NUM_CANDIDATES,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Declarative description of a query tool, immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryToolConfig {
    pub name: String,
    pub kind: String,
    /// Name of the source binding that provides the backing store
    pub source: String,
    pub description: String,
    pub collection: String,
    pub operation: Operation,
    /// Base query/pipeline template
    pub query: QueryDocument,
    pub auth_required: Vec<String>,
    pub parameters: ParameterSchema,
    /// Raw request-body template. Carried for hosts; dispatch ignores it.
    pub request_body: Option<String>,
    pub vector_search: VectorSearchTuning,
}

impl QueryToolConfig {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: QUERY_TOOL_KIND.to_string(),
            source: source.into(),
            description: String::new(),
            collection: collection.into(),
            operation: Operation::default(),
            query: QueryDocument::new(),
            auth_required: Vec::new(),
            parameters: ParameterSchema::empty(),
            request_body: None,
            vector_search: VectorSearchTuning::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    pub fn with_query(mut self, query: QueryDocument) -> Self {
        self.query = query;
        self
    }

    pub fn with_auth_required(mut self, services: Vec<String>) -> Self {
        self.auth_required = services;
        self
    }

    pub fn with_parameters(mut self, parameters: ParameterSchema) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_request_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = Some(body.into());
        self
    }

    pub fn with_vector_search(mut self, tuning: VectorSearchTuning) -> Self {
        self.vector_search = tuning;
        self
    }

    /// Detect issues that make the tool fail at invocation time.
    ///
    /// Binding still succeeds with these present; the host decides whether
    /// to surface them.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.kind != QUERY_TOOL_KIND {
            issues.push(ConfigIssue {
                severity: Severity::Error,
                code: ConfigIssueCode::InvalidKind {
                    tool: self.name.clone(),
                    kind: self.kind.clone(),
                },
                message: format!(
                    "tool '{}': kind '{}' is not '{}'",
                    self.name, self.kind, QUERY_TOOL_KIND
                ),
            });
        }

        match &self.operation {
            Operation::Find => {}
            Operation::Aggregate => issues.push(ConfigIssue {
                severity: Severity::Warning,
                code: ConfigIssueCode::OperationNotImplemented {
                    tool: self.name.clone(),
                },
                message: format!(
                    "tool '{}': aggregate operation is not implemented, every call will fail",
                    self.name
                ),
            }),
            Operation::VectorSearch => issues.extend(self.validate_vector_search()),
            Operation::Unsupported(kind) => issues.push(ConfigIssue {
                severity: Severity::Error,
                code: ConfigIssueCode::UnknownOperation {
                    tool: self.name.clone(),
                    operation: kind.clone(),
                },
                message: format!(
                    "tool '{}': unknown operation '{}', expected find, aggregate or vectorSearch",
                    self.name, kind
                ),
            }),
        }

        issues
    }

    fn validate_vector_search(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        let expectations: [(&str, fn(&ParameterType) -> bool); 3] = [
            (INDEX_NAME_PARAM, |t| *t == ParameterType::String),
            (QUERY_VECTOR_PARAM, |t| {
                matches!(t.items(), Some(ParameterType::Float | ParameterType::Integer))
            }),
            (PATH_PARAM, |t| *t == ParameterType::String),
        ];

        for (name, type_ok) in expectations {
            let declared_ok = self
                .parameters
                .get(name)
                .is_some_and(|p| type_ok(&p.param_type));
            if !declared_ok {
                issues.push(ConfigIssue {
                    severity: Severity::Warning,
                    code: ConfigIssueCode::VectorSearchParameter {
                        tool: self.name.clone(),
                        parameter: name.to_string(),
                    },
                    message: format!(
                        "tool '{}': vectorSearch needs a correctly typed '{}' parameter",
                        self.name, name
                    ),
                });
            }
        }

        let tuning = self.vector_search;
        if tuning.limit == 0 || tuning.limit > tuning.num_candidates {
            issues.push(ConfigIssue {
                severity: Severity::Warning,
                code: ConfigIssueCode::VectorSearchTuning {
                    tool: self.name.clone(),
                },
                message: format!(
                    "tool '{}': vectorSearch limit {} must be between 1 and numCandidates {}",
                    self.name, tuning.limit, tuning.num_candidates
                ),
            });
        }

        issues
    }
}
