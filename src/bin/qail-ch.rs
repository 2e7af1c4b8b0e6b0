//! qail-ch: ClickHouse type bridge CLI
//!
//! Developer tool over the `qail_clickhouse` library.
//!
//! # Usage
//!
//! ```bash
//! # Parse a store type
//! qail-ch parse "LowCardinality(Nullable(String))"
//!
//! # Format a JSON value as a literal
//! qail-ch literal "Array(Tuple(String, UInt8))" '[["a", 1]]'
//!
//! # Render DDL for a schema file
//! qail-ch ddl schema.toml --cluster main
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use qail_clickhouse::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "qail-ch")]
#[command(author = "QAIL Contributors")]
#[command(version)]
#[command(about = "ClickHouse type bridge: store types, literals and DDL", long_about = None)]
#[command(after_help = "EXAMPLES:
    qail-ch parse 'Map(String, Array(Decimal64(2)))'
    qail-ch literal 'Nullable(DateTime64(3))' '\"2024-03-01 12:00:00.5\"'
    qail-ch ddl schema.toml")]
struct Cli {
    /// Config file (defaults to QAIL_CH_CONFIG, then ~/.config/qail/clickhouse.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a store type and show its tree, canonical form and native type
    Parse {
        /// Store type, e.g. `Array(Nullable(Int32))`
        store_type: String,
    },
    /// Format a JSON value as a literal of a store type
    Literal {
        store_type: String,
        /// Value as JSON
        json: String,
    },
    /// Render CREATE statements for a TOML schema file
    Ddl {
        schema: PathBuf,

        /// Emit ON CLUSTER for every statement
        #[arg(long)]
        cluster: Option<String>,
    },
}

/// Schema file for the `ddl` command.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SchemaFile {
    tables: Vec<Table>,
    views: Vec<MaterializedView>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "qail_clickhouse=debug" } else { "qail_clickhouse=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = BridgeConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let registry = MappingRegistry::with_config(&config)?;
    let resolver = TypeResolver::new(&registry);

    match &cli.command {
        Commands::Parse { store_type } => explain_type(store_type),
        Commands::Literal { store_type, json } => format_json(&resolver, store_type, json),
        Commands::Ddl { schema, cluster } => {
            render_schema(&resolver, &config, schema, cluster.as_deref())
        }
    }
}

fn explain_type(raw: &str) -> Result<()> {
    let Some(node) = parse_type(raw) else {
        bail!("not a valid store type: {}", raw);
    };
    let native = qail_clickhouse::mapping::resolver::native_for(&node, None);

    println!("{}", "Parsed:".green().bold());
    println!("{:#?}", node);
    println!();
    println!("{} {}", "Canonical:".cyan(), node.to_string().white());
    println!("{} {}", "Native:".cyan(), native.to_string().yellow());
    Ok(())
}

fn format_json(resolver: &TypeResolver<'_>, store_type: &str, json: &str) -> Result<()> {
    let mapping = resolver
        .resolve_store_type(store_type, None)
        .with_context(|| format!("not a valid store type: {}", store_type))?;
    let json: serde_json::Value = serde_json::from_str(json).context("value is not valid JSON")?;
    let value = match mapping.node.unwrapped() {
        TypeNode::Json(_) => Value::Json(json),
        _ => Value::from_json(&json),
    };
    println!("{}", format_literal(&mapping, &value)?);
    Ok(())
}

fn render_schema(
    resolver: &TypeResolver<'_>,
    config: &BridgeConfig,
    path: &Path,
    cluster: Option<&str>,
) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let schema: SchemaFile =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

    let mut translator =
        DdlTranslator::new(resolver).with_engine_defaults(config.engine.clone());
    if let Some(cluster) = cluster {
        translator = translator.on_cluster(cluster);
    }

    let ops: Vec<SchemaOp> = schema
        .tables
        .into_iter()
        .map(SchemaOp::CreateTable)
        .chain(schema.views.into_iter().map(SchemaOp::CreateMaterializedView))
        .collect();
    if ops.is_empty() {
        eprintln!("{}", "⚠ Schema file defines no tables or views".yellow());
        return Ok(());
    }

    for statement in translator.translate_all(&ops)? {
        println!("{};\n", statement);
    }
    Ok(())
}
