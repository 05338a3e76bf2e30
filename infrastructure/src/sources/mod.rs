//! Source adapters
//!
//! Builds the [`SourceMap`] tools are bound against from the `[sources]`
//! section of the config file.
//!
//! | Kind | Adapter | Notes |
//! |------|---------|-------|
//! | `memory` | [`MemorySource`] | seeded from config, always available |
//! | `mongodb` | `MongoSource` | requires the `mongodb` feature |

mod matcher;
pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;

pub use memory::{MEMORY_SOURCE_KIND, MemoryCollection, MemorySource, MemoryStore};
#[cfg(feature = "mongodb")]
pub use mongo::{MONGODB_SOURCE_KIND, MongoSource};

use crate::config::{FileSourceConfig, SourceKind};
use docquery_application::{Source, SourceMap};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors raised while building a single source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceBuildError {
    #[error("source '{source_name}': unknown kind '{kind}'")]
    UnknownKind { source_name: String, kind: String },

    #[error("source '{source_name}': kind '{kind}' requires the '{feature}' feature")]
    FeatureDisabled {
        source_name: String,
        kind: String,
        feature: &'static str,
    },

    #[error("source '{source_name}': {reason}")]
    Invalid { source_name: String, reason: String },

    #[error("source '{source_name}': unable to connect: {reason}")]
    Connection { source_name: String, reason: String },
}

impl SourceBuildError {
    pub fn source_name(&self) -> &str {
        match self {
            SourceBuildError::UnknownKind { source_name, .. }
            | SourceBuildError::FeatureDisabled { source_name, .. }
            | SourceBuildError::Invalid { source_name, .. }
            | SourceBuildError::Connection { source_name, .. } => source_name,
        }
    }
}

/// Build one source from its config entry.
pub async fn build_source(
    name: &str,
    config: &FileSourceConfig,
) -> Result<Arc<dyn Source>, SourceBuildError> {
    let (kind, issues) = config.parse_kind(name);
    let kind = kind.ok_or_else(|| SourceBuildError::UnknownKind {
        source_name: name.to_string(),
        kind: config.kind.clone(),
    })?;

    if let Some(issue) = issues.iter().find(|issue| issue.is_error()) {
        return Err(SourceBuildError::Invalid {
            source_name: name.to_string(),
            reason: issue.message.clone(),
        });
    }

    match kind {
        SourceKind::Memory => Ok(Arc::new(MemorySource::from_config(name, config))),
        #[cfg(feature = "mongodb")]
        SourceKind::MongoDb => Ok(Arc::new(MongoSource::connect(name, config).await?)),
        #[cfg(not(feature = "mongodb"))]
        SourceKind::MongoDb => Err(SourceBuildError::FeatureDisabled {
            source_name: name.to_string(),
            kind: kind.to_string(),
            feature: "mongodb",
        }),
    }
}

/// Build every configured source.
///
/// A source that fails to build is logged and left out; tools bound to it
/// then fail with an unknown-source error instead of stopping the host.
pub async fn build_sources(
    configs: &BTreeMap<String, FileSourceConfig>,
) -> (SourceMap, Vec<SourceBuildError>) {
    let mut sources = SourceMap::new();
    let mut errors = Vec::new();

    for (name, config) in configs {
        match build_source(name, config).await {
            Ok(source) => {
                tracing::info!(source = %name, kind = %source.kind(), "Built source");
                sources.insert(name.clone(), source);
            }
            Err(e) => {
                warn!(source = %name, error = %e, "Skipping source");
                errors.push(e);
            }
        }
    }

    (sources, errors)
}
