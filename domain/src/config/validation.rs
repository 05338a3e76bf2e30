//! Configuration validation issues.
//!
//! Tool configurations can be well-formed yet unusable: an unknown operation,
//! a vectorSearch tool missing its required parameters, a tool pointing at a
//! source that does not exist. These are reported as structured issues with
//! severity levels instead of failing the whole load.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal for the affected tool: it cannot be bound or will never succeed.
    Error,
    /// Non-fatal: the tool binds but some invocations will fail.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// Tool kind tag is not the query tool kind.
    InvalidKind { tool: String, kind: String },
    /// Operation name is not one of find / aggregate / vectorSearch.
    UnknownOperation { tool: String, operation: String },
    /// Operation is recognized but has no executor yet (aggregate).
    OperationNotImplemented { tool: String },
    /// A vectorSearch tool does not declare one of its required parameters.
    VectorSearchParameter { tool: String, parameter: String },
    /// vectorSearch limit is zero or exceeds the candidate pool.
    VectorSearchTuning { tool: String },
    /// Tool references a source that is not configured.
    UnknownSource { tool: String, source: String },
    /// Parameter declarations could not be turned into a schema.
    InvalidParameters { tool: String },
    /// Source kind is not one this build can construct.
    UnknownSourceKind { source: String, kind: String },
    /// Source is missing a setting its kind needs.
    MissingSourceSetting { source: String, setting: String },
    /// Source sets something its kind does not use.
    IgnoredSourceSetting { source: String, setting: String },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}
