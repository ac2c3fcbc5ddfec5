//! rowdoc - export database rows to a JSON document and replay them back
//!
//! Two subcommands over the same job configuration file:
//!
//! - `export` runs the configured extraction queries and writes the
//!   versioned document to a file or stdout.
//! - `import` validates a document, clears the destination tables in
//!   deletion order, and inserts in creation order, one transaction per
//!   table.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rowdoc_core::{DependencyOrder, TableExportSpec};
use rowdoc_driver_sqlite::SqliteConnection;
use rowdoc_interchange::{Document, Exporter, Importer, document_to_columnar};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rowdoc", about = "Relational rows to JSON documents and back", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export configured tables into a JSON document
    Export {
        /// Path to the SQLite database (or ":memory:")
        #[arg(short, long, env = "ROWDOC_DATABASE")]
        database: String,

        /// Job configuration file (tables, queries, dependency orders)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit the structure-of-arrays layout instead of row objects
        #[arg(long)]
        columnar: bool,
    },

    /// Import a JSON document into the destination database
    Import {
        /// Path to the SQLite database
        #[arg(short, long, env = "ROWDOC_DATABASE")]
        database: String,

        /// Job configuration file (tables, queries, dependency orders)
        #[arg(short, long)]
        config: PathBuf,

        /// Document to import
        #[arg(short, long)]
        input: PathBuf,
    },
}

/// The job configuration: which tables move, with which queries, and the
/// two referential orderings the import phases follow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobConfig {
    tables: Vec<TableExportSpec>,
    deletion_order: Vec<String>,
    creation_order: Vec<String>,
}

impl JobConfig {
    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: JobConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    fn dependency_order(&self) -> Result<DependencyOrder> {
        DependencyOrder::new(self.deletion_order.clone(), self.creation_order.clone())
            .context("invalid dependency orders in config")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Export {
            database,
            config,
            output,
            columnar,
        } => export(&database, &config, output.as_deref(), columnar).await,
        Command::Import {
            database,
            config,
            input,
        } => import(&database, &config, &input).await,
    }
}

async fn export(
    database: &str,
    config: &Path,
    output: Option<&Path>,
    columnar: bool,
) -> Result<()> {
    let config = JobConfig::load(config)?;
    let connection = Arc::new(SqliteConnection::open(database)?);

    let outcome = Exporter::new(connection).export(&config.tables).await?;
    for report in &outcome.reports {
        for failure in &report.failures {
            eprintln!("{}: {}", report.table, failure);
        }
    }

    let json = if columnar {
        serde_json::to_string_pretty(&document_to_columnar(&outcome.document))?
    } else {
        serde_json::to_string_pretty(&outcome.document)?
    };

    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "document written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn import(database: &str, config: &Path, input: &Path) -> Result<()> {
    let config = JobConfig::load(config)?;
    let order = config.dependency_order()?;

    let raw = std::fs::read(input)
        .with_context(|| format!("failed to read document {}", input.display()))?;
    let document = Document::from_slice(&raw)
        .with_context(|| format!("invalid document {}", input.display()))?;

    let connection = Arc::new(SqliteConnection::open(database)?);
    let summary = Importer::new(connection, order).import(&document).await?;

    for (table, affected) in &summary.deleted {
        println!("cleared {table}: {affected} row(s)");
    }
    for (table, rows) in &summary.inserted {
        println!("imported {table}: {rows} row(s)");
    }
    for failure in &summary.failures {
        eprintln!("failed {}: {}", failure.table, failure.reason);
    }

    if !summary.is_clean() {
        bail!("{} table(s) failed to import", summary.failures.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_config_parses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(
            &path,
            r#"{
                "tables": [
                    { "name": "Tags", "query": "SELECT * FROM Tags ORDER BY Tag_Code" }
                ],
                "deletionOrder": ["Tags"],
                "creationOrder": ["Tags"]
            }"#,
        )
        .unwrap();

        let config = JobConfig::load(&path).unwrap();
        assert_eq!(config.tables.len(), 1);
        assert_eq!(config.tables[0].name, "Tags");
        let order = config.dependency_order().unwrap();
        assert_eq!(order.deletion(), &["Tags"]);
    }

    #[test]
    fn test_mismatched_orders_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(
            &path,
            r#"{
                "tables": [],
                "deletionOrder": ["A", "B"],
                "creationOrder": ["A"]
            }"#,
        )
        .unwrap();

        let config = JobConfig::load(&path).unwrap();
        assert!(config.dependency_order().is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let err = JobConfig::load(Path::new("/nonexistent/job.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
