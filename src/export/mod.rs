//! Query export.
//!
//! Two interchangeable strategies:
//! - `Driver`: run the query in-process and write the result set to Parquet.
//! - `Vsql`: run the query through the `vsql` CLI, gzip its delimited output.

pub mod parquet;
pub mod vsql;

use crate::config::{ConnectionConfig, ProjectPaths};
use crate::db::{self, DatabaseClient};
use crate::error::{ExtractError, Result};
use crate::sql::QueryText;
use std::path::PathBuf;
use tracing::info;

pub use self::parquet::{read_parquet, write_parquet};
pub use self::vsql::{HeaderMode, VsqlCommand, VsqlExporter};

/// How a query is executed and persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportStrategy {
    /// Native driver call, result written as Parquet.
    #[default]
    Driver,
    /// External `vsql | gzip` pipeline.
    Vsql,
}

/// Where an export is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub path: PathBuf,
    /// Keep the header row (vsql path only).
    pub header: bool,
}

impl ExportTarget {
    pub fn new(path: impl Into<PathBuf>, header: bool) -> Self {
        Self {
            path: path.into(),
            header,
        }
    }
}

/// Outcome of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub strategy: ExportStrategy,
    /// Rows written, when known. The vsql path does not count rows.
    pub rows: Option<usize>,
}

/// Runs `query` on an open client and writes the result to Parquet.
pub async fn export_with_client(
    client: &dyn DatabaseClient,
    query: &QueryText,
    target: &ExportTarget,
) -> Result<ExportSummary> {
    let sql = query.raw().trim();
    if query.is_blank() {
        return Err(ExtractError::query("query file contains no SQL"));
    }

    let result = client.execute_query(sql).await?;
    let rows = write_parquet(&result, &target.path)?;

    Ok(ExportSummary {
        path: target.path.clone(),
        strategy: ExportStrategy::Driver,
        rows: Some(rows),
    })
}

/// Driver path: connect, export, close.
pub async fn export_via_driver(
    config: &ConnectionConfig,
    query: &QueryText,
    target: &ExportTarget,
) -> Result<ExportSummary> {
    let client = db::connect(config).await?;
    let outcome = export_with_client(client.as_ref(), query, target).await;
    client.close().await?;
    outcome
}

/// External-process path. Bare output names land in the project's raw-data
/// directory.
pub fn export_via_vsql(
    exporter: &VsqlExporter,
    config: &ConnectionConfig,
    query: &QueryText,
    target: &ExportTarget,
    paths: &ProjectPaths,
) -> Result<ExportSummary> {
    let command = exporter.command(config, query, HeaderMode::from_header(target.header))?;
    let output = vsql::output_path(&paths.raw_data_dir(), &target.path);
    exporter.run(&command, &output)?;

    info!("Export finished: {}", output.display());
    Ok(ExportSummary {
        path: output,
        strategy: ExportStrategy::Vsql,
        rows: None,
    })
}
