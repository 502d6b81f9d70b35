//! make-dataset - run a SQL file against Vertica and save the result.

use tracing::{error, info};
use warehouse_extract::cli::DatasetCli;
use warehouse_extract::config::ProjectPaths;
use warehouse_extract::credentials::{self, CredentialSources};
use warehouse_extract::error::Result;
use warehouse_extract::export::{self, ExportStrategy, ExportSummary, VsqlExporter};
use warehouse_extract::logging;
use warehouse_extract::sql::QueryText;

fn main() {
    let cli = DatasetCli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

fn run(cli: &DatasetCli) -> Result<()> {
    info!("Making dataset from {}", cli.input.display());
    let query = QueryText::read(&cli.input)?;

    let cwd = std::env::current_dir()?;
    let env = credentials::env_snapshot(std::env::vars_os());
    let sources = CredentialSources::discover(&cwd, env)?
        .with_explicit(cli.to_connection_config()?)
        .with_overrides(cli.overrides());
    let resolved = credentials::resolve(&sources, &cli.scope())?;

    let target = cli.target();
    let summary = match cli.strategy {
        ExportStrategy::Driver => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(export::export_via_driver(&resolved.config, &query, &target))?
        }
        ExportStrategy::Vsql => {
            let exporter = VsqlExporter::new()
                .with_vsql(&cli.vsql)
                .with_gzip(&cli.gzip);
            let paths = ProjectPaths::discover(&cwd);
            export::export_via_vsql(&exporter, &resolved.config, &query, &target, &paths)?
        }
    };

    report(&summary);
    Ok(())
}

fn report(summary: &ExportSummary) {
    match summary.rows {
        Some(rows) => info!("Saved {rows} rows to {}", summary.path.display()),
        None => info!("Saved output to {}", summary.path.display()),
    }
}
