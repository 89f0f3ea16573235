use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Per-probe budget covering connect, send, and receive.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Plain DNS port for UDP and TCP
pub const DNS_PORT: u16 = 53;

/// DNS-over-TLS port (RFC 7858)
pub const DOT_PORT: u16 = 853;

/// Transport protocol used for a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
	Udp,
	Tcp,
	Dot,
	Doh,
}

impl Protocol {
	pub const ALL: [Protocol; 4] = [Protocol::Udp, Protocol::Tcp, Protocol::Dot, Protocol::Doh];

	/// Lowercase identifier used in config files and API requests.
	pub fn as_str(self) -> &'static str {
		match self {
			Protocol::Udp => "udp",
			Protocol::Tcp => "tcp",
			Protocol::Dot => "dot",
			Protocol::Doh => "doh",
		}
	}

	/// Port used when the server address names none. DoH takes its port
	/// from the URL instead.
	pub fn default_port(self) -> Option<u16> {
		match self {
			Protocol::Udp | Protocol::Tcp => Some(DNS_PORT),
			Protocol::Dot => Some(DOT_PORT),
			Protocol::Doh => None,
		}
	}
}

impl fmt::Display for Protocol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Protocol {
	type Err = QueryError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		Protocol::ALL
			.into_iter()
			.find(|p| p.as_str().eq_ignore_ascii_case(trimmed))
			.ok_or_else(|| QueryError::UnsupportedProtocol(s.to_string()))
	}
}

/// A configured name server to probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTarget {
	pub name: String,
	/// Host, optionally with a port, or a DoH URL
	pub address: String,
	/// Raw protocol identifiers; parsed at dispatch time
	#[serde(default)]
	pub protocols: Vec<String>,
}

/// Result of a single (server, domain, protocol) probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
	pub server_name: String,
	pub server_address: String,
	pub domain: String,
	pub protocol: String,
	#[serde(rename = "response_ips")]
	pub response_addresses: Vec<String>,
	/// Wall-clock time of the attempt in milliseconds, recorded on failure too
	#[serde(rename = "response_time")]
	pub response_time_ms: u64,
	#[serde(rename = "success")]
	pub succeeded: bool,
	/// Set iff `succeeded` is false
	pub error: Option<String>,
}

/// Probe run configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
	pub timeout: Duration,
	/// Maximum number of probes in flight; 1 runs them strictly in sequence
	pub max_inflight: usize,
}

impl Default for ProbeConfig {
	fn default() -> Self {
		Self {
			timeout: QUERY_TIMEOUT,
			max_inflight: 1,
		}
	}
}
