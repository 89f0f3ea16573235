mod cli;
mod config;
mod dns;
mod error;
mod output;
mod probe;
mod query;
mod resolver;
mod server;
mod stats;
mod transport;

#[cfg(test)]
mod testutil;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::output::{Progress, Report, ReportFormat};
use crate::server::AppState;
use crate::transport::ProbeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	// Logs go to stderr so reports on stdout stay clean
	let default_level = if cli.verbose { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();

	let probe_config = ProbeConfig {
		max_inflight: cli.concurrency,
		..ProbeConfig::default()
	};

	if cli.server {
		tracing::info!(addr = %cli.addr, "Starting DNS Tester server");
		return server::serve(&cli.addr, AppState { probe: probe_config }).await;
	}

	let config = config::load_config(&cli.config)?;
	output::print_run_header(&config, probe_config.max_inflight);

	let mut progress = Progress::default();
	let results = probe::run_probes(&config.servers, &config.domains, &probe_config, |r| {
		progress.record(r);
	}).await;
	progress.finish();

	let format = if cli.csv {
		ReportFormat::Csv
	} else if cli.json {
		ReportFormat::Json
	} else {
		ReportFormat::Text
	};

	println!("Generating report...");
	let report = Report::new(results);
	output::write_report(&report, cli.output.as_deref(), format)?;

	if let Some(path) = &cli.output {
		println!("\nReport saved to: {}", path);
	}

	Ok(())
}
