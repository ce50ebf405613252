//! Dialect specifications and their registry

mod spec;

pub use spec::DialectSpec;

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Dialect not found: {0}")]
    DialectNotFound(String),

    #[error("Dialect already registered: {0}")]
    DuplicateDialect(String),

    #[error("Failed to read dialect file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse dialect file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Dialect file layout: `dialects: [<spec>, ...]`.
#[derive(Debug, Deserialize)]
struct DialectFile {
    #[serde(default)]
    dialects: Vec<DialectSpec>,
}

/// Named dialect specifications.
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    dialects: HashMap<String, Arc<DialectSpec>>,
}

impl DialectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `base`, `postgres`, `duckdb` and `risingwave`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for spec in DialectSpec::builtins() {
            registry.dialects.insert(spec.name.clone(), Arc::new(spec));
        }
        registry
    }

    pub fn register(&mut self, spec: DialectSpec) -> Result<(), RegistryError> {
        if self.dialects.contains_key(&spec.name) {
            return Err(RegistryError::DuplicateDialect(spec.name));
        }
        debug!(
            dialect = %spec.name,
            unsupported = spec.unsupported.len(),
            "Registered dialect"
        );
        self.dialects.insert(spec.name.clone(), Arc::new(spec));
        Ok(())
    }

    /// Register several dialects at once. Nothing is registered if any name is taken,
    /// either by an existing dialect or by an earlier entry of `specs`.
    pub fn register_all<I>(&mut self, specs: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = DialectSpec>,
    {
        let specs: Vec<DialectSpec> = specs.into_iter().collect();
        let mut seen = HashSet::new();
        for spec in &specs {
            if self.dialects.contains_key(&spec.name) || !seen.insert(spec.name.as_str()) {
                return Err(RegistryError::DuplicateDialect(spec.name.clone()));
            }
        }
        specs.into_iter().try_for_each(|spec| self.register(spec))
    }

    pub fn get(&self, name: &str) -> Result<Arc<DialectSpec>, RegistryError> {
        self.dialects
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::DialectNotFound(name.to_string()))
    }

    /// Registered dialect names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.dialects.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register every dialect in a YAML document, returning their names.
    pub fn from_yaml_str(&mut self, yaml: &str) -> Result<Vec<String>, RegistryError> {
        let file: DialectFile = serde_yaml::from_str(yaml)?;
        let names = file.dialects.iter().map(|spec| spec.name.clone()).collect();
        self.register_all(file.dialects)?;
        Ok(names)
    }

    pub fn load_yaml(&mut self, path: impl AsRef<Path>) -> Result<Vec<String>, RegistryError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Loading dialect file");
        self.from_yaml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_ir::OpKind;

    #[test]
    fn test_builtin_lookup() {
        let registry = DialectRegistry::with_builtins();

        let spec = registry.get("risingwave").unwrap();
        assert_eq!(spec.name, "risingwave");
        assert!(!spec.supports(OpKind::Mode));

        assert_eq!(
            registry.names(),
            vec!["base", "duckdb", "postgres", "risingwave"]
        );
    }

    #[test]
    fn test_unknown_dialect() {
        let registry = DialectRegistry::with_builtins();
        let err = registry.get("oracle").unwrap_err();
        assert!(matches!(err, RegistryError::DialectNotFound(name) if name == "oracle"));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = DialectRegistry::with_builtins();
        let err = registry.register(DialectSpec::postgres()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDialect(_)));
    }
}
