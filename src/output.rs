use std::fs::File;
use std::io::{self, Write};

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use crate::config::Config;
use crate::stats::{summarize, Summary};
use crate::transport::QueryResult;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
	Text,
	Csv,
	Json,
}

/// Full results of one run plus their summary
#[derive(Debug, Clone, Serialize)]
pub struct Report {
	pub results: Vec<QueryResult>,
	pub summary: Summary,
}

impl Report {
	pub fn new(results: Vec<QueryResult>) -> Self {
		let summary = summarize(&results);
		Self { results, summary }
	}
}

/// Print what is about to be tested.
pub fn print_run_header(config: &Config, max_inflight: usize) {
	println!("Starting DNS tests...");
	println!(
		"Testing {} domain(s) against {} server(s)...",
		config.domains.len(), config.servers.len(),
	);
	if max_inflight > 1 {
		println!("Concurrency:    {}", max_inflight);
	}
	println!();
}

/// Console progress printer: one block per server, one line pair per probe.
#[derive(Debug, Default)]
pub struct Progress {
	current: Option<(String, String)>,
}

impl Progress {
	/// Print the result of one finished probe.
	pub fn record(&mut self, r: &QueryResult) {
		let is_current = self.current.as_ref()
			.is_some_and(|(name, address)| *name == r.server_name && *address == r.server_address);
		if !is_current {
			if self.current.is_some() {
				println!();
			}
			println!("Testing server: {} ({})", r.server_name, r.server_address);
			self.current = Some((r.server_name.clone(), r.server_address.clone()));
		}
		println!("  Querying {} via {}...", r.domain, r.protocol);
		println!("    {}", progress_line(r));
	}

	/// Close the last server block.
	pub fn finish(&self) {
		if self.current.is_some() {
			println!();
		}
	}
}

fn progress_line(r: &QueryResult) -> String {
	if r.succeeded {
		format!("✓ Success: {} (Time: {} ms)", format_ips(&r.response_addresses), r.response_time_ms)
	} else {
		format!("✗ Failed: {}", r.error.as_deref().unwrap_or("unknown error"))
	}
}

/// Format an address list for console output.
pub fn format_ips(ips: &[String]) -> String {
	match ips {
		[] => "No IPs".to_string(),
		[only] => only.clone(),
		_ => format!("{} IPs: {}", ips.len(), ips.join(", ")),
	}
}

/// Render the report to `path`, or to stdout when no path is given.
pub fn write_report(report: &Report, path: Option<&str>, format: ReportFormat) -> Result<()> {
	match path {
		Some(path) => {
			let file = File::create(path)
				.with_context(|| format!("failed to create output file '{}'", path))?;
			let mut writer = io::BufWriter::new(file);
			render(&mut writer, report, format)?;
			writer.flush()?;
		}
		None => {
			let stdout = io::stdout();
			let mut writer = stdout.lock();
			render(&mut writer, report, format)?;
			writer.flush()?;
		}
	}
	Ok(())
}

/// Render the report in the requested format.
pub fn render<W: Write>(writer: &mut W, report: &Report, format: ReportFormat) -> Result<()> {
	match format {
		ReportFormat::Text => write_text(writer, report),
		ReportFormat::Csv => write_csv(writer, report),
		ReportFormat::Json => write_json(writer, report),
	}
}

/// Write the human-readable report: summary block plus a results table.
pub fn write_text<W: Write>(writer: &mut W, report: &Report) -> Result<()> {
	writeln!(writer, "DNS Tester Report")?;
	writeln!(writer, "=================\n")?;
	write_summary(writer, &report.summary)?;

	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	// Rows stay on one line regardless of terminal width
	table.set_content_arrangement(ContentArrangement::Disabled);
	table.set_header(vec![
		"Server", "Address", "Domain", "Protocol",
		"Response IPs", "Time (ms)", "Status", "Error",
	]);

	for r in &report.results {
		let ips = if r.response_addresses.is_empty() {
			"N/A".to_string()
		} else {
			r.response_addresses.join(", ")
		};
		table.add_row(vec![
			r.server_name.clone(),
			r.server_address.clone(),
			r.domain.clone(),
			r.protocol.clone(),
			ips,
			r.response_time_ms.to_string(),
			if r.succeeded { "✓" } else { "✗" }.to_string(),
			r.error.clone().unwrap_or_else(|| "-".to_string()),
		]);
	}

	writeln!(writer, "\nDetailed Results")?;
	writeln!(writer, "================\n")?;
	writeln!(writer, "{table}")?;
	Ok(())
}

fn write_summary<W: Write>(writer: &mut W, summary: &Summary) -> io::Result<()> {
	writeln!(writer, "Summary")?;
	writeln!(writer, "-------")?;
	writeln!(writer, "Total Queries:    {}", summary.total_queries)?;
	writeln!(writer, "Successful:       {}", summary.successful)?;
	writeln!(writer, "Failed:           {}", summary.failed)?;
	if let (Some(min), Some(max)) = (summary.min_time_ms, summary.max_time_ms) {
		writeln!(writer, "Average Time:     {:.2} ms", summary.average_time_ms)?;
		writeln!(writer, "Min Time:         {} ms", min)?;
		writeln!(writer, "Max Time:         {} ms", max)?;
	}
	Ok(())
}

/// Write one CSV row per result. Address lists are `; `-joined.
pub fn write_csv<W: Write>(writer: &mut W, report: &Report) -> Result<()> {
	let mut csv_writer = csv::Writer::from_writer(writer);

	csv_writer.write_record([
		"Server", "Address", "Domain", "Protocol",
		"Response IPs", "Time (ms)", "Status", "Error",
	]).context("failed to write CSV header")?;

	for r in &report.results {
		let ips = if r.response_addresses.is_empty() {
			"N/A".to_string()
		} else {
			r.response_addresses.join("; ")
		};
		csv_writer.write_record([
			r.server_name.as_str(),
			r.server_address.as_str(),
			r.domain.as_str(),
			r.protocol.as_str(),
			ips.as_str(),
			r.response_time_ms.to_string().as_str(),
			if r.succeeded { "Success" } else { "Failed" },
			r.error.as_deref().unwrap_or(""),
		]).context("failed to write CSV row")?;
	}

	csv_writer.flush()?;
	Ok(())
}

/// Write `{results, summary}` as pretty-printed JSON.
pub fn write_json<W: Write>(writer: &mut W, report: &Report) -> Result<()> {
	serde_json::to_writer_pretty(&mut *writer, report)?;
	writeln!(writer)?;
	Ok(())
}
