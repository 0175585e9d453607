//! Configuration module, loads the repository settings from a JSON file

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::DEFAULT_ALIAS;
use crate::parser::{DEFAULT_FIND_ALL, DEFAULT_PREFIX};

pub const DEFAULT_PAGE_SIZE: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read config file {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {}: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings shared by every method compiled for a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Prefix that marks a method as derived, `findBy` by default
    pub method_prefix: String,
    /// Method name selecting every entity, `findAll` by default
    pub find_all_method: String,
    /// Alias of the root entity in generated queries
    pub root_alias: String,
    /// Page size used by result cursors when none is set
    pub default_page_size: u64,
    pub table_mapping: TableMapping,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            method_prefix: DEFAULT_PREFIX.to_string(),
            find_all_method: DEFAULT_FIND_ALL.to_string(),
            root_alias: DEFAULT_ALIAS.to_string(),
            default_page_size: DEFAULT_PAGE_SIZE,
            table_mapping: TableMapping::default(),
        }
    }
}

impl RepositoryConfig {
    /// Loads the configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Entity name to table name mapping, used when lowering to SQL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableMapping {
    mappings: BTreeMap<String, String>,
}

impl TableMapping {
    pub fn insert(&mut self, entity: impl Into<String>, table: impl Into<String>) {
        self.mappings.insert(entity.into(), table.into());
    }

    /// Table for the entity; falls back to the snake-cased entity name
    pub fn table_name(&self, entity: &str) -> String {
        self.mappings
            .get(entity)
            .cloned()
            .unwrap_or_else(|| entity.to_case(Case::Snake))
    }

    pub fn mappings(&self) -> &BTreeMap<String, String> {
        &self.mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "method_prefix": "queryBy",
                "default_page_size": 25,
                "table_mapping": {{
                    "Person": "people",
                    "OrderLine": "order_lines"
                }}
            }}"#
        )
        .unwrap();

        let config = RepositoryConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.method_prefix, "queryBy");
        assert_eq!(config.default_page_size, 25);
        assert_eq!(config.find_all_method, "findAll");
        assert_eq!(config.root_alias, "e");
        assert_eq!(config.table_mapping.table_name("Person"), "people");
        assert_eq!(config.table_mapping.table_name("OrderLine"), "order_lines");
    }

    #[test]
    fn test_invalid_json_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "invalid json").unwrap();

        let result = RepositoryConfig::from_json_file(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = RepositoryConfig::from_json_file(dir.path().join("repository.json"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_default_config() {
        let config = RepositoryConfig::default();
        assert_eq!(config.method_prefix, "findBy");
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.table_mapping.table_name("UserAccount"), "user_account");
    }

    #[test]
    fn test_table_mapping_insert() {
        let mut mapping = TableMapping::default();
        mapping.insert("Person", "people");
        assert_eq!(mapping.table_name("Person"), "people");
        assert_eq!(mapping.mappings().len(), 1);
    }
}
