use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::transport::{Protocol, ServerTarget};

/// Root of the YAML configuration file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub domains: Vec<String>,
	#[serde(default)]
	pub servers: Vec<ServerTarget>,
}

/// Read, parse, and validate a YAML configuration file.
pub fn load_config(path: &str) -> Result<Config> {
	let content = std::fs::read_to_string(path)
		.with_context(|| format!("failed to read config file '{}'", path))?;
	parse_config(&content)
}

/// Parse and validate YAML configuration text.
pub fn parse_config(content: &str) -> Result<Config> {
	let config: Config = serde_yaml::from_str(content)
		.context("failed to parse YAML")?;
	validate_config(&config)
		.map_err(|e| anyhow!("invalid configuration: {}", e))?;
	Ok(config)
}

/// Check the constraints the probe engine relies on.
pub fn validate_config(config: &Config) -> Result<()> {
	if config.domains.is_empty() {
		bail!("no domains defined");
	}
	if let Some(i) = config.domains.iter().position(|d| d.trim().is_empty()) {
		bail!("domain {}: must not be empty", i);
	}

	if config.servers.is_empty() {
		bail!("no servers defined");
	}

	for (i, server) in config.servers.iter().enumerate() {
		if server.name.trim().is_empty() {
			bail!("server {}: name is required", i);
		}
		if server.address.trim().is_empty() {
			bail!("server {}: address is required", i);
		}
		if server.protocols.is_empty() {
			bail!("server {}: at least one protocol must be specified", i);
		}
		for protocol in &server.protocols {
			if protocol.parse::<Protocol>().is_err() {
				bail!(
					"server {}: invalid protocol '{}'. Must be one of: udp, tcp, dot, doh",
					i, protocol,
				);
			}
		}
	}

	Ok(())
}
