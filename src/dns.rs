use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};

use crate::error::QueryError;

/// Build an A query for the given domain.
///
/// The name is forced to its fully-qualified form, so "example.com" and
/// "example.com." produce identical questions. Internationalized labels
/// are punycode-encoded.
/// Returns the serialized query bytes ready to send on the wire.
pub fn build_query(domain: &str, txid: u16) -> Result<Vec<u8>, QueryError> {
	let mut name = Name::from_utf8(domain.trim())
		.map_err(|source| QueryError::InvalidDomain {
			domain: domain.to_string(),
			source,
		})?;
	name.set_fqdn(true);

	let mut message = Message::new();
	message.set_id(txid);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name, RecordType::A));

	message.to_vec().map_err(QueryError::Encode)
}

/// Parse a DNS response and extract the A and AAAA answers in order.
///
/// Fails if the bytes cannot be decoded, the message is not a response,
/// the transaction ID does not match, or the response code is not NoError.
/// Answer records of any other type (CNAME chains, etc.) are skipped.
pub fn parse_response(bytes: &[u8], expected_txid: u16) -> Result<Vec<String>, QueryError> {
	let message = Message::from_vec(bytes).map_err(QueryError::Decode)?;

	if message.message_type() != MessageType::Response {
		return Err(QueryError::NotAResponse);
	}

	if message.id() != expected_txid {
		return Err(QueryError::IdMismatch {
			expected: expected_txid,
			actual: message.id(),
		});
	}

	let rcode = message.response_code();
	if rcode != ResponseCode::NoError {
		return Err(QueryError::ResponseCode(rcode));
	}

	let addresses = message.answers().iter()
		.filter_map(|record| match record.data() {
			RData::A(a) => Some(a.to_string()),
			RData::AAAA(aaaa) => Some(aaaa.to_string()),
			_ => None,
		})
		.collect();
	Ok(addresses)
}

/// Prefix a message with its 2-byte big-endian length for stream transports.
pub fn frame_stream_message(message: &[u8]) -> Result<Vec<u8>, QueryError> {
	let len = u16::try_from(message.len())
		.map_err(|_| QueryError::Encode("message exceeds 65535 bytes".into()))?;
	let mut framed = Vec::with_capacity(message.len() + 2);
	framed.extend_from_slice(&len.to_be_bytes());
	framed.extend_from_slice(message);
	Ok(framed)
}
