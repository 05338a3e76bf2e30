//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to domain types on demand.

mod sources;
mod tools;

pub use sources::{FileSourceConfig, SourceKind};
pub use tools::{
    FileParamAuthService, FileParameterConfig, FileToolConfig, FileVectorSearchConfig,
};

use docquery_domain::{ConfigIssue, ConfigIssueCode, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Backing-store bindings by name
    pub sources: BTreeMap<String, FileSourceConfig>,
    /// Query tools by name
    pub tools: BTreeMap<String, FileToolConfig>,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// This is the single entry point for config validation. It checks:
    /// 1. Source kinds and their required settings
    /// 2. Tool parameter declarations
    /// 3. Tool-level issues (kind tag, operation, vectorSearch setup)
    /// 4. Tools referring to sources that are not configured
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for (name, source) in &self.sources {
            issues.extend(source.parse_kind(name).1);
        }

        for (name, tool) in &self.tools {
            match tool.to_tool_config(name) {
                Ok(config) => issues.extend(config.validate()),
                Err(e) => issues.push(ConfigIssue {
                    severity: Severity::Error,
                    code: ConfigIssueCode::InvalidParameters { tool: name.clone() },
                    message: format!("tool '{}': {}", name, e),
                }),
            }

            if !self.sources.contains_key(&tool.source) {
                issues.push(ConfigIssue {
                    severity: Severity::Error,
                    code: ConfigIssueCode::UnknownSource {
                        tool: name.clone(),
                        source: tool.source.clone(),
                    },
                    message: format!(
                        "tool '{}': source '{}' is not configured",
                        name, tool.source
                    ),
                });
            }
        }

        issues
    }
}
