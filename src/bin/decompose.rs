//! CLI entry point: parses flags, resolves configuration, drives a single
//! decomposition run, and reports a one-line error on failure.

use anyhow::Context;
use clap::Parser;

use decompose::config::Cli;
use decompose::config::Config;
use decompose::decompose::Decomposer;
use decompose::output;
use decompose::report;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let debug = cli.debug;
    let config = Config::resolve(cli).context("resolving configuration")?;

    report::init_logging(&config.output_directory, debug).context("initializing logging")?;
    log::info!("decomposing {}", config.alignment.display());

    let mut decomposer = Decomposer::new(config).context("initializing decomposer")?;
    let stats = decomposer.decompose().context("running decomposition")?;
    output::write_all(&decomposer).context("writing outputs")?;

    log::info!(
        "done: {} final node(s), {} sequence(s) after qc, {} relocated outlier(s)",
        stats.num_final_nodes,
        stats.num_sequences_after_qc,
        stats.num_relocated,
    );
    Ok(())
}
