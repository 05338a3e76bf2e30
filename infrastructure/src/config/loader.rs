//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix for environment overrides, e.g. `DOCQUERY_TOOLS__FIND_USER__COLLECTION`
pub const ENV_PREFIX: &str = "DOCQUERY_";

/// Project-level config file names, checked in order
const PROJECT_CONFIG_FILES: [&str; 2] = ["docquery.toml", ".docquery.toml"];

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Extract(#[from] Box<figment::Error>),
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables prefixed with `DOCQUERY_`, `__` separating levels
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./docquery.toml` or `./.docquery.toml`
    /// 4. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, ConfigLoadError> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(path) = Self::project_config_path() {
            tracing::debug!(path = %path.display(), "Merging project config");
            figment = figment.merge(Toml::file(path));
        }

        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigLoadError::NotFound(path.to_path_buf()));
            }
            tracing::debug!(path = %path.display(), "Merging explicit config");
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::extract(figment)
    }

    /// Parse configuration from a TOML string, without environment overrides
    pub fn from_toml_str(content: &str) -> Result<FileConfig, ConfigLoadError> {
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(FileConfig::default()))
                .merge(Toml::string(content)),
        )
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    fn extract(figment: Figment) -> Result<FileConfig, ConfigLoadError> {
        let config: FileConfig = figment.extract().map_err(Box::new)?;
        tracing::info!(
            sources = config.sources.len(),
            tools = config.tools.len(),
            "Loaded configuration"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::io::Write;

    const CONFIG: &str = r#"
[sources.app_db]
kind = "memory"
database = "app"

[tools.find_user]
kind = "mongodb-atlas"
source = "app_db"
description = "Find users"
collection = "users"
"#;

    #[test]
    fn test_from_toml_str() {
        let config = ConfigLoader::from_toml_str(CONFIG).unwrap();
        assert_eq!(config.sources["app_db"].database, "app");
        assert_eq!(config.tools["find_user"].source, "app_db");
    }

    #[test]
    fn test_from_empty_string_gives_defaults() {
        let config = ConfigLoader::from_toml_str("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_missing_required_tool_field() {
        let err = ConfigLoader::from_toml_str(
            r#"
[tools.broken]
kind = "mongodb-atlas"
source = "app_db"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("collection"));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let config = ConfigLoader::load(Some(file.path())).unwrap();
        assert_eq!(config.tools["find_user"].description, "Find users");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = ConfigLoader::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigLoadError::NotFound(p) if p == path));
    }

    #[test]
    fn test_env_overrides_project_file() {
        Jail::expect_with(|jail| {
            jail.create_file("docquery.toml", CONFIG)?;
            jail.set_env("DOCQUERY_TOOLS__FIND_USER__COLLECTION", "people");

            let config = ConfigLoader::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.tools["find_user"].collection, "people");
            assert_eq!(config.tools["find_user"].description, "Find users");
            Ok(())
        });
    }
}
