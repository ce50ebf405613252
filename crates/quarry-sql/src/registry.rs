//! Compilers by dialect name

use quarry_ir::NodeRef;
use quarry_registry::{DialectRegistry, DialectSpec};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::dialects::{BaseCompiler, DuckDbCompiler, PostgresCompiler, RisingWaveCompiler};
use crate::sql::SqlFragment;
use crate::{CompileError, SqlCompiler};

#[derive(Clone, Default)]
pub struct CompilerRegistry {
    compilers: HashMap<String, Arc<dyn SqlCompiler>>,
}

impl CompilerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `base`, `postgres`, `duckdb` and `risingwave`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(BaseCompiler::new()));
        registry.register(Arc::new(PostgresCompiler::new()));
        registry.register(Arc::new(DuckDbCompiler::new()));
        registry.register(Arc::new(RisingWaveCompiler::new()));
        registry
    }

    /// Built-in compilers plus a data-driven compiler for every other dialect in `dialects`.
    pub fn from_dialects(dialects: &DialectRegistry) -> Result<Self, CompileError> {
        let mut registry = Self::with_builtins();
        for name in dialects.names() {
            if registry.compilers.contains_key(&name) {
                continue;
            }
            let spec = dialects
                .get(&name)
                .map_err(|_| CompileError::UnknownDialect(name.clone()))?;
            registry.register_spec(spec.as_ref().clone());
        }
        Ok(registry)
    }

    /// Add a compiler under its dialect name, returning any compiler it replaces.
    pub fn register(&mut self, compiler: Arc<dyn SqlCompiler>) -> Option<Arc<dyn SqlCompiler>> {
        let name = compiler.name().to_string();
        debug!(dialect = %name, "Registered compiler");
        self.compilers.insert(name, compiler)
    }

    /// Register a dialect described only by its spec; it uses the default handlers.
    pub fn register_spec(&mut self, spec: DialectSpec) -> Option<Arc<dyn SqlCompiler>> {
        self.register(Arc::new(BaseCompiler::with_spec(spec)))
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn SqlCompiler>, CompileError> {
        self.compilers
            .get(name)
            .cloned()
            .ok_or_else(|| CompileError::UnknownDialect(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.compilers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn compile(&self, node: &NodeRef, dialect: &str) -> Result<SqlFragment, CompileError> {
        self.get(dialect)?.compile(node)
    }
}

impl fmt::Debug for CompilerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerRegistry")
            .field("dialects", &self.names())
            .finish()
    }
}
