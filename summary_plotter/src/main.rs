use anyhow::{bail, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::analysis::overlay::PlottersRenderer;
use crate::analysis::summary::SummaryPlotter;
use crate::cli::Args;
use crate::config::RunConfig;
use crate::data_handling::columnar::CsvOpener;
use crate::expansion::expand_all;

mod analysis;
mod binning;
mod cli;
mod config;
mod data_handling;
mod expansion;
mod helper_functions;
mod models;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = RunConfig::from_args(&args)?;

    info!("Starting summary plots");

    // "tree,energy,signal,ana;tree,energy,signal,ana;..."
    let groups = expand_all(&config.lines, &config.domains);
    info!("Expanded {} into {} plot group(s)", config.lines, groups.len());
    for (i, group) in groups.iter().enumerate() {
        info!("  [{}] {}", i, group);
    }
    if groups.is_empty() {
        warn!("Nothing to plot");
        return Ok(());
    }

    let renderer = PlottersRenderer::new(config.log_plots);
    let plotter = SummaryPlotter::new(&config, CsvOpener, renderer);
    let report = plotter.run(&groups)?;

    info!(
        "Wrote {} file(s), skipped {} plot(s), {} failed",
        report.rendered.len(),
        report.skipped,
        report.failed.len()
    );
    if !report.failed.is_empty() {
        bail!("{} plot(s) failed: {}", report.failed.len(), report.failed.join(", "));
    }
    Ok(())
}
