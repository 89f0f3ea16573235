use std::fmt;

use crate::error::QueryError;

/// Host and port a stream or datagram probe connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
	/// Hostname or IP literal, without brackets
	pub host: String,
	pub port: u16,
}

impl Endpoint {
	/// Parse a server address, filling in `default_port` when none is given.
	///
	/// Supports formats:
	///   "1.1.1.1"              -- IPv4, default port
	///   "1.1.1.1:5353"         -- IPv4 with explicit port
	///   "dns.google:853"       -- hostname with explicit port
	///   "2606:4700::1111"      -- bare IPv6, default port
	///   "[2606:4700::1111]:53" -- bracketed IPv6 with port
	pub fn parse(address: &str, default_port: u16) -> Result<Self, QueryError> {
		let trimmed = address.trim();
		if trimmed.is_empty() {
			return Err(QueryError::InvalidAddress(address.to_string()));
		}
		let invalid = || QueryError::InvalidAddress(address.to_string());

		let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
			// Bracketed IPv6, with or without port
			let (host, after) = rest.split_once(']').ok_or_else(invalid)?;
			let port = match after {
				"" => default_port,
				_ => after.strip_prefix(':')
					.and_then(|p| p.parse().ok())
					.ok_or_else(invalid)?,
			};
			(host, port)
		} else if trimmed.matches(':').count() > 1 {
			// Bare IPv6 cannot carry a port
			(trimmed, default_port)
		} else if let Some((host, port)) = trimmed.split_once(':') {
			(host, port.parse().map_err(|_| invalid())?)
		} else {
			(trimmed, default_port)
		};

		if host.is_empty() {
			return Err(invalid());
		}
		Ok(Self { host: host.to_string(), port })
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.host.contains(':') {
			write!(f, "[{}]:{}", self.host, self.port)
		} else {
			write!(f, "{}:{}", self.host, self.port)
		}
	}
}

/// Build the DoH endpoint URL for a server address.
///
/// Adds "https://" unless a scheme is present and appends "/dns-query"
/// unless the address already names a query path.
pub fn doh_url(address: &str) -> String {
	let trimmed = address.trim();
	let mut url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
		trimmed.to_string()
	} else {
		format!("https://{}", trimmed)
	};
	if !url.contains("/dns-query") && !url.contains("/resolve") {
		if !url.ends_with('/') {
			url.push('/');
		}
		url.push_str("dns-query");
	}
	url
}
