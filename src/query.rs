use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::dns::{build_query, frame_stream_message, parse_response};
use crate::error::QueryError;
use crate::resolver::{doh_url, Endpoint};
use crate::transport::Protocol;

/// Receive buffer for UDP answers, large enough for EDNS-sized responses
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// Media type for wire-format DNS over HTTPS (RFC 8484)
const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

impl Protocol {
	/// Resolve `domain` against the server at `address` over this protocol.
	///
	/// The whole exchange (lookup, connect, handshake, send, receive) shares
	/// one `timeout` budget. Returns the A/AAAA literals from the answer.
	pub async fn resolve(
		self,
		address: &str,
		domain: &str,
		timeout: Duration,
	) -> Result<Vec<String>, QueryError> {
		let exchange = async {
			match self {
				Protocol::Udp => resolve_udp(address, domain).await,
				Protocol::Tcp => resolve_tcp(address, domain).await,
				Protocol::Dot => resolve_dot(address, domain).await,
				Protocol::Doh => resolve_doh(address, domain).await,
			}
		};
		tokio::time::timeout(timeout, exchange)
			.await
			.map_err(|_| QueryError::Timeout(timeout))?
	}
}

/// Parse a server address, filling in the protocol's default port.
fn server_endpoint(protocol: Protocol, address: &str) -> Result<Endpoint, QueryError> {
	let default_port = protocol
		.default_port()
		.ok_or_else(|| QueryError::InvalidAddress(address.to_string()))?;
	Endpoint::parse(address, default_port)
}

/// SNI and certificate name for a DoT endpoint: its host portion.
fn tls_server_name(endpoint: &Endpoint) -> Result<ServerName<'static>, QueryError> {
	ServerName::try_from(endpoint.host.clone())
		.map_err(|_| QueryError::InvalidServerName(endpoint.host.clone()))
}

/// Look up the first socket address for an endpoint.
async fn lookup(endpoint: &Endpoint) -> Result<SocketAddr, QueryError> {
	tokio::net::lookup_host((endpoint.host.as_str(), endpoint.port))
		.await?
		.next()
		.ok_or_else(|| QueryError::Unresolvable(endpoint.host.clone()))
}

/// Single datagram exchange.
///
/// The socket is connected to the server so ICMP errors surface as
/// `ConnectionRefused` instead of waiting out the timeout. Datagrams with a
/// foreign transaction ID are late answers to someone else and are skipped.
async fn resolve_udp(address: &str, domain: &str) -> Result<Vec<String>, QueryError> {
	let endpoint = server_endpoint(Protocol::Udp, address)?;
	let server = lookup(&endpoint).await?;

	let txid: u16 = rand::random();
	let query = build_query(domain, txid)?;

	let bind_addr = if server.is_ipv4() {
		"0.0.0.0:0"
	} else {
		"[::]:0"
	};
	let socket = UdpSocket::bind(bind_addr).await?;
	socket.connect(server).await?;
	let bytes_sent = socket.send(&query).await?;
	debug!(server = %server, domain, bytes_sent, "UDP query sent");

	let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
	loop {
		let len = socket.recv(&mut buf).await?;
		match parse_response(&buf[..len], txid) {
			Err(QueryError::IdMismatch { expected, actual }) => {
				warn!(server = %server, expected, actual, "Ignoring UDP response with wrong txid");
			}
			outcome => {
				debug!(server = %server, bytes_received = len, "UDP response received");
				return outcome;
			}
		}
	}
}

async fn resolve_tcp(address: &str, domain: &str) -> Result<Vec<String>, QueryError> {
	let endpoint = server_endpoint(Protocol::Tcp, address)?;
	let mut stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
	debug!(server = %endpoint, domain, "TCP connection established");
	stream_exchange(&mut stream, domain).await
}

/// TCP framing inside TLS. The certificate must match the host portion of
/// the address, which is also sent as SNI.
async fn resolve_dot(address: &str, domain: &str) -> Result<Vec<String>, QueryError> {
	let endpoint = server_endpoint(Protocol::Dot, address)?;
	let server_name = tls_server_name(&endpoint)?;
	let connector = TlsConnector::from(tls_client_config()?);

	let tcp = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
	let mut tls = connector.connect(server_name, tcp)
		.await
		.map_err(|source| QueryError::TlsHandshake {
			server_name: endpoint.host.clone(),
			source,
		})?;
	debug!(server = %endpoint, domain, "TLS session established");
	stream_exchange(&mut tls, domain).await
}

/// Wire query as an HTTP POST body (RFC 8484 §4.1).
///
/// The transaction ID is 0 as the RFC recommends for cache friendliness.
/// The complete body is read before decoding so large answers are not cut.
async fn resolve_doh(address: &str, domain: &str) -> Result<Vec<String>, QueryError> {
	let url = doh_url(address);
	let query = build_query(domain, 0)?;
	debug!(url = %url, domain, message_len = query.len(), "Sending DoH query");

	let response = http_client()?
		.post(&url)
		.header(CONTENT_TYPE, DNS_MESSAGE_CONTENT_TYPE)
		.header(ACCEPT, DNS_MESSAGE_CONTENT_TYPE)
		.body(query)
		.send()
		.await?;

	let status = response.status();
	if !status.is_success() {
		return Err(QueryError::HttpStatus(status));
	}

	let body = response.bytes().await?;
	debug!(url = %url, response_len = body.len(), "DoH response received");
	parse_response(&body, 0)
}

/// Length-prefixed query/answer over any byte stream (RFC 1035 §4.2.2).
async fn stream_exchange<S>(stream: &mut S, domain: &str) -> Result<Vec<String>, QueryError>
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	let txid: u16 = rand::random();
	let query = build_query(domain, txid)?;
	stream.write_all(&frame_stream_message(&query)?).await?;
	stream.flush().await?;

	let mut len_buf = [0u8; 2];
	stream.read_exact(&mut len_buf).await?;
	let mut response = vec![0u8; u16::from_be_bytes(len_buf) as usize];
	stream.read_exact(&mut response).await?;
	parse_response(&response, txid)
}

/// Shared TLS client configuration trusting the webpki root set.
fn tls_client_config() -> Result<Arc<ClientConfig>, QueryError> {
	static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();
	if let Some(config) = CONFIG.get() {
		return Ok(config.clone());
	}

	let roots = RootCertStore {
		roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
	};
	let provider = Arc::new(rustls::crypto::ring::default_provider());
	let config = ClientConfig::builder_with_provider(provider)
		.with_safe_default_protocol_versions()?
		.with_root_certificates(roots)
		.with_no_client_auth();
	Ok(CONFIG.get_or_init(|| Arc::new(config)).clone())
}

/// Shared HTTP client; connection pooling keeps repeat DoH probes cheap.
fn http_client() -> Result<reqwest::Client, QueryError> {
	static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
	if let Some(client) = CLIENT.get() {
		return Ok(client.clone());
	}
	let client = reqwest::Client::builder()
		.use_rustls_tls()
		.build()?;
	Ok(CLIENT.get_or_init(|| client).clone())
}
