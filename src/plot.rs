//! Figure generation stub.
//!
//! Reads a processed dataset and writes a placeholder figure. The drawing
//! itself is left to the project that adopts this template.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Steps reported while "rendering".
const RENDER_STEPS: usize = 10;

/// Inputs for [`generate_plot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotArgs {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

/// What was read and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub output_path: PathBuf,
}

/// Reads the CSV at `args.input_path` and writes a placeholder SVG.
pub fn generate_plot(args: &PlotArgs) -> Result<PlotSummary> {
    info!("Generating plot from {}", args.input_path.display());

    let (columns, rows) = read_dataset(&args.input_path)?;
    info!("Loaded {} rows x {} columns", rows, columns.len());

    for step in 1..=RENDER_STEPS {
        debug!("Render step {step}/{RENDER_STEPS}");
        if step == RENDER_STEPS / 2 {
            info!("Halfway through rendering ({step}/{RENDER_STEPS})");
        }
    }

    if let Some(parent) = args.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let svg = placeholder_svg(&args.input_path, rows, &columns);
    std::fs::write(&args.output_path, svg)
        .with_context(|| format!("Failed to write {}", args.output_path.display()))?;

    info!("Plot generation complete: {}", args.output_path.display());
    Ok(PlotSummary {
        rows,
        columns,
        output_path: args.output_path.clone(),
    })
}

fn read_dataset(path: &Path) -> Result<(Vec<String>, usize)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open dataset {}", path.display()))?;

    let columns = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = 0;
    for record in reader.records() {
        record.with_context(|| format!("Malformed record {} in {}", rows + 1, path.display()))?;
        rows += 1;
    }

    Ok((columns, rows))
}

fn placeholder_svg(input: &Path, rows: usize, columns: &[String]) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = escape_xml(&format!("{name}: {rows} rows, {} columns", columns.len()));
    let subtitle = escape_xml(&columns.join(", "));

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="640" height="480" viewBox="0 0 640 480">
  <rect width="640" height="480" fill="white" stroke="black"/>
  <text x="320" y="230" text-anchor="middle" font-family="sans-serif" font-size="18">{title}</text>
  <text x="320" y="260" text-anchor="middle" font-family="sans-serif" font-size="12">{subtitle}</text>
</svg>
"#
    )
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
