//! Dialect SQL compilation for Quarry IR
//!
//! ```text
//! IR node ──► SqlCompiler::compile ──► SqlFragment (Expr | Query) ──► SQL text
//!                 │
//!                 └── DialectSpec: unsupported ops, unit vocabularies, flags
//! ```

pub mod compiler;
pub mod dialects;
mod error;
pub mod literal;
pub mod registry;
pub mod relation;
pub mod sql;

pub use compiler::{interval_from_integer, SqlCompiler};
pub use dialects::{BaseCompiler, DuckDbCompiler, PostgresCompiler, RisingWaveCompiler};
pub use error::CompileError;
pub use literal::encode;
pub use registry::CompilerRegistry;
pub use sql::{OrderByExpr, Select, SqlExpr, SqlFragment};
