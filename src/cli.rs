use clap::Parser;

/// DNS server tester
#[derive(Parser, Debug)]
#[command(name = "dns-tester")]
#[command(about = "Test DNS servers over UDP, TCP, DoT, and DoH")]
pub struct Cli {
	/// Path to YAML configuration file
	#[arg(short = 'c', long = "config", default_value = "config.yaml")]
	pub config: String,

	/// Path to output report file (default: stdout)
	#[arg(short = 'o', long = "output")]
	pub output: Option<String>,

	/// Output report in CSV format
	#[arg(long = "csv", conflicts_with = "json")]
	pub csv: bool,

	/// Output report in JSON format
	#[arg(long = "json")]
	pub json: bool,

	/// Run in server mode (HTTP web UI and API)
	#[arg(long = "server")]
	pub server: bool,

	/// Server listen address
	#[arg(long = "addr", default_value = ":8080")]
	pub addr: String,

	/// Maximum concurrent probes (1 runs them one at a time)
	#[arg(short = 'j', long = "concurrency", default_value = "1")]
	pub concurrency: usize,

	/// Enable debug logging
	#[arg(short = 'v', long = "verbose")]
	pub verbose: bool,
}
