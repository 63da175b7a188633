//! statsq CLI - Plan statistics requests offline
//!
//! Usage:
//!   statsq plan --catalog <name|file> --request <request.json> [--dialect <dialect>] [--now <rfc3339>]
//!   statsq fields --catalog <name|file>
//!
//! Examples:
//!   statsq plan --catalog billing --request cost_by_cluster.json
//!   statsq plan --catalog deployment --request daily.json --dialect bigquery --output verbose
//!   statsq fields --catalog billing
//!
//! Tag and label filters are never resolved here: they are dropped with a
//! warning.

use chrono::DateTime;
use clap::{Parser, Subcommand, ValueEnum};
use statsq::catalog::{billing, deployment, FieldCatalog};
use statsq::config::Settings;
use statsq::normalize::{FixedClock, OfflineIdResolver};
use statsq::sql::SqlDialect;
use statsq::{Dialect, RequestPlanner, StatsRequest};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "statsq")]
#[command(about = "statsq - Compile statistics requests to SQL")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a statsq.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan a request and print the SQL
    Plan {
        /// Built-in catalog (billing, deployment), configured catalog, or catalog file
        #[arg(short, long)]
        catalog: String,

        /// Path to the request JSON
        #[arg(short, long)]
        request: PathBuf,

        /// SQL dialect to generate (defaults to the configured one)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Instant the default time window ends at (RFC 3339)
        #[arg(long)]
        now: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        output: OutputFormat,
    },

    /// List the fields of a catalog
    Fields {
        /// Built-in catalog (billing, deployment), configured catalog, or catalog file
        #[arg(short, long)]
        catalog: String,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Postgres,
    Duckdb,
    Bigquery,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Bigquery => Dialect::BigQuery,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Output SQL only
    Sql,
    /// Output SQL with a plan summary
    Verbose,
    /// Output the projected fields as JSON
    Fields,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Plan {
            catalog,
            request,
            dialect,
            now,
            output,
        } => cmd_plan(&settings, &catalog, request, dialect, now, output).await,
        Commands::Fields { catalog } => cmd_fields(&settings, &catalog),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_catalog(settings: &Settings, name: &str) -> Result<FieldCatalog, String> {
    match name {
        "billing" => return Ok(billing()),
        "deployment" => return Ok(deployment()),
        _ => {}
    }
    let path = if settings.catalogs.contains_key(name) {
        settings.catalog_path(name).map_err(|e| e.to_string())?
    } else {
        PathBuf::from(name)
    };
    FieldCatalog::load(&path).map_err(|e| e.to_string())
}

async fn cmd_plan(
    settings: &Settings,
    catalog: &str,
    request: PathBuf,
    dialect: Option<DialectArg>,
    now: Option<String>,
    output: OutputFormat,
) -> ExitCode {
    let catalog = match load_catalog(settings, catalog) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading catalog '{}': {}", catalog, e);
            return ExitCode::FAILURE;
        }
    };

    let source = match fs::read_to_string(&request) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", request.display(), e);
            return ExitCode::FAILURE;
        }
    };
    let parsed: StatsRequest = match serde_json::from_str(&source) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Invalid request '{}': {}", request.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let dialect = match dialect {
        Some(d) => d.into(),
        None => match settings.dialect() {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let mut planner = RequestPlanner::new(Arc::new(catalog), Arc::new(OfflineIdResolver))
        .with_window_days(settings.query.default_window_days);
    if let Some(now) = &now {
        match DateTime::parse_from_rfc3339(now) {
            Ok(t) => planner = planner.with_clock(Arc::new(FixedClock(t.timestamp_millis()))),
            Err(e) => {
                eprintln!("Invalid --now '{}': {}", now, e);
                return ExitCode::FAILURE;
            }
        }
    }

    let plan = match planner.prepare(&parsed).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Planning error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match output {
        OutputFormat::Sql => {
            println!("{}", plan.to_sql(dialect));
        }
        OutputFormat::Verbose => {
            println!("-- statsq plan");
            println!("-- Catalog: {}", planner.catalog().name());
            println!("-- Dialect: {}", dialect.name());
            println!("-- Shape: {}", plan.shape);
            for field in &plan.projected_fields {
                println!("-- Column: {} ({:?})", field.alias, field.data_type);
            }
            println!();
            println!("{}", plan.to_sql(dialect));
        }
        OutputFormat::Fields => match serde_json::to_string_pretty(&plan.projected_fields) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing plan: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

fn cmd_fields(settings: &Settings, catalog: &str) -> ExitCode {
    let catalog = match load_catalog(settings, catalog) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading catalog '{}': {}", catalog, e);
            return ExitCode::FAILURE;
        }
    };

    let table = catalog.table();
    println!("Catalog: {}", catalog.name());
    match &table.schema {
        Some(schema) => println!("Table: {}.{}", schema, table.name),
        None => println!("Table: {}", table.name),
    }
    println!();

    println!("Fields:");
    for field in catalog.fields() {
        println!(
            "  - {} (column: \"{}\", type: {:?}, kind: {:?})",
            field.name, field.column, field.data_type, field.filter_kind
        );
    }

    ExitCode::SUCCESS
}
