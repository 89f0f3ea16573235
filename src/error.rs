use std::time::Duration;

use hickory_proto::op::ResponseCode;
use hickory_proto::ProtoError;
use thiserror::Error;

/// Everything that can go wrong during a single probe.
///
/// None of these abort a run: the dispatcher turns each one into the
/// `error` text of a failed `QueryResult`.
#[derive(Debug, Error)]
pub enum QueryError {
	#[error("unsupported protocol: {0}")]
	UnsupportedProtocol(String),

	#[error("invalid server address '{0}'")]
	InvalidAddress(String),

	#[error("invalid domain name '{domain}': {source}")]
	InvalidDomain {
		domain: String,
		#[source]
		source: ProtoError,
	},

	#[error("failed to pack DNS message: {0}")]
	Encode(#[source] ProtoError),

	#[error("failed to unpack DNS response: {0}")]
	Decode(#[source] ProtoError),

	#[error("received a query instead of a response")]
	NotAResponse,

	#[error("txid mismatch: expected {expected}, got {actual}")]
	IdMismatch { expected: u16, actual: u16 },

	#[error("DNS query failed with RCODE: {} ({})", rcode_value(.0), .0)]
	ResponseCode(ResponseCode),

	#[error("no address found for '{0}'")]
	Unresolvable(String),

	#[error("query timed out after {} ms", .0.as_millis())]
	Timeout(Duration),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("invalid TLS server name '{0}'")]
	InvalidServerName(String),

	#[error("TLS setup failed: {0}")]
	Tls(#[from] rustls::Error),

	#[error("TLS handshake with {server_name} failed: {source}")]
	TlsHandshake {
		server_name: String,
		#[source]
		source: std::io::Error,
	},

	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("HTTP request failed with status: {}", .0.as_u16())]
	HttpStatus(reqwest::StatusCode),
}

fn rcode_value(code: &ResponseCode) -> u16 {
	u16::from(*code)
}
