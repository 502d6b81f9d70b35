//! some-plot - generate a figure from a processed dataset.

use tracing::error;
use warehouse_extract::cli::PlotCli;
use warehouse_extract::config::ProjectPaths;
use warehouse_extract::logging;
use warehouse_extract::plot;

fn main() {
    let cli = PlotCli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &PlotCli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let args = cli.to_plot_args(&ProjectPaths::discover(&cwd));
    plot::generate_plot(&args)?;
    Ok(())
}
