//! quarry: compile serialized IR to dialect SQL
//!
//! ```bash
//! quarry compile plan.json --dialect risingwave
//! quarry compile plan.json --ast
//! quarry dialects
//! quarry fingerprint plan.json
//! ```

mod config;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quarry_ir::NodeRef;
use quarry_registry::DialectRegistry;
use quarry_sql::CompilerRegistry;
use std::path::{Path, PathBuf};
use tracing::info;

use config::{Config, OutputFormat};

#[derive(Debug, Parser, PartialEq)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(
        short,
        long,
        global = true,
        default_value = "quarry.yaml",
        help = "Configuration file; defaults apply when it does not exist"
    )]
    config: PathBuf,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq)]
enum Command {
    /// Compile a JSON-serialized IR node
    Compile {
        file: PathBuf,

        #[clap(short, long, help = "Target dialect, overriding compile.default_dialect")]
        dialect: Option<String>,

        #[clap(long, help = "Print the SQL AST as JSON instead of SQL text")]
        ast: bool,
    },
    /// List registered dialects
    Dialects,
    /// Print the SHA-256 fingerprint of a JSON-serialized IR node
    Fingerprint { file: PathBuf },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    logging::init(&config.logging)?;

    let output = run(&args.command, &config)?;
    println!("{}", output);
    Ok(())
}

fn run(command: &Command, config: &Config) -> Result<String> {
    match command {
        Command::Compile { file, dialect, ast } => {
            let node = read_node(file)?;
            let dialect = dialect
                .as_deref()
                .unwrap_or(&config.compile.default_dialect);
            let output = if *ast {
                OutputFormat::Ast
            } else {
                config.compile.output
            };

            let compilers = compilers(config)?;
            info!(dialect, kind = %node.kind(), "Compiling");
            let fragment = compilers.compile(&node, dialect)?;

            match output {
                OutputFormat::Sql => Ok(fragment.to_sql()),
                OutputFormat::Ast => Ok(serde_json::to_string_pretty(&fragment)?),
            }
        }
        Command::Dialects => Ok(compilers(config)?.names().join("\n")),
        Command::Fingerprint { file } => Ok(read_node(file)?.fingerprint()),
    }
}

/// Built-in compilers plus every dialect from the configuration.
fn compilers(config: &Config) -> Result<CompilerRegistry> {
    let mut dialects = DialectRegistry::with_builtins();
    dialects.register_all(config.dialects.iter().cloned())?;
    for path in &config.dialect_files {
        let names = dialects
            .load_yaml(path)
            .with_context(|| format!("loading dialects from {}", path.display()))?;
        info!(path = %path.display(), dialects = ?names, "Loaded dialect file");
    }
    Ok(CompilerRegistry::from_dialects(&dialects)?)
}

fn read_node(path: &Path) -> Result<NodeRef> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let node: NodeRef = serde_json::from_str(&contents)
        .with_context(|| format!("parsing IR node from {}", path.display()))?;
    Ok(node)
}
