//! Built-in dialect compilers

pub mod base;
pub mod duckdb;
pub mod postgres;
pub mod risingwave;

pub use base::BaseCompiler;
pub use duckdb::DuckDbCompiler;
pub use postgres::PostgresCompiler;
pub use risingwave::RisingWaveCompiler;
