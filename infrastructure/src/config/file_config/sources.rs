//! Source configuration from TOML (`[sources.<name>]` sections)
//!
//! Example configuration:
//!
//! ```toml
//! [sources.app_db]
//! kind = "memory"
//! database = "app"
//!
//! [[sources.app_db.collections.users]]
//! _id = 1
//! name = "Alice"
//!
//! [sources.atlas]
//! kind = "mongodb"
//! database = "app"
//! uri = "mongodb://localhost:27017"
//! ```

use docquery_domain::{ConfigIssue, ConfigIssueCode, Document, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source kinds this crate knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// In-process store seeded from the config file
    Memory,
    /// MongoDB deployment (requires the `mongodb` feature)
    MongoDb,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Memory => "memory",
            SourceKind::MongoDb => "mongodb",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single `[sources.<name>]` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSourceConfig {
    /// Source kind: "memory" or "mongodb"
    pub kind: String,
    /// Database the source is scoped to
    pub database: String,
    /// Connection string (mongodb only)
    pub uri: Option<String>,
    /// Seed documents per collection (memory only)
    pub collections: BTreeMap<String, Vec<Document>>,
}

impl FileSourceConfig {
    /// Parse the kind tag, collecting issues for the named source.
    pub fn parse_kind(&self, name: &str) -> (Option<SourceKind>, Vec<ConfigIssue>) {
        let kind = match self.kind.to_lowercase().as_str() {
            "memory" => SourceKind::Memory,
            "mongodb" => SourceKind::MongoDb,
            _ => {
                return (
                    None,
                    vec![ConfigIssue {
                        severity: Severity::Error,
                        code: ConfigIssueCode::UnknownSourceKind {
                            source: name.to_string(),
                            kind: self.kind.clone(),
                        },
                        message: format!(
                            "source '{}': unknown kind '{}', expected memory or mongodb",
                            name, self.kind
                        ),
                    }],
                );
            }
        };
        (Some(kind), self.check_settings(name, kind))
    }

    fn check_settings(&self, name: &str, kind: SourceKind) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.database.is_empty() {
            issues.push(missing_setting(name, "database"));
        }

        if kind == SourceKind::MongoDb {
            if self.uri.as_deref().is_none_or(str::is_empty) {
                issues.push(missing_setting(name, "uri"));
            }
            if !self.collections.is_empty() {
                issues.push(ConfigIssue {
                    severity: Severity::Warning,
                    code: ConfigIssueCode::IgnoredSourceSetting {
                        source: name.to_string(),
                        setting: "collections".to_string(),
                    },
                    message: format!(
                        "source '{}': seed collections are ignored for mongodb sources",
                        name
                    ),
                });
            }
        }

        issues
    }
}

fn missing_setting(source: &str, setting: &str) -> ConfigIssue {
    ConfigIssue {
        severity: Severity::Error,
        code: ConfigIssueCode::MissingSourceSetting {
            source: source.to_string(),
            setting: setting.to_string(),
        },
        message: format!("source '{}': '{}' is required", source, setting),
    }
}
