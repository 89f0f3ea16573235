//! In-process stub name servers for tests.

use std::net::{IpAddr, SocketAddr};

use axum::body::Bytes;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{RData, Record};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

/// Answer a raw query the way a stub server would.
///
/// Each address becomes an A or AAAA record; `rcode` is copied verbatim.
pub fn build_response<S: AsRef<str>>(query: &[u8], rcode: ResponseCode, addresses: &[S]) -> Vec<u8> {
	let mut message = Message::from_vec(query).unwrap();
	let name = message.queries()[0].name().clone();
	message.set_message_type(MessageType::Response);
	message.set_recursion_available(true);
	message.set_response_code(rcode);
	for addr in addresses {
		let rdata = match addr.as_ref().parse::<IpAddr>().unwrap() {
			IpAddr::V4(v4) => RData::A(A(v4)),
			IpAddr::V6(v6) => RData::AAAA(AAAA(v6)),
		};
		message.add_answer(Record::from_rdata(name.clone(), 60, rdata));
	}
	message.to_vec().unwrap()
}

fn owned(addresses: &[&str]) -> Vec<String> {
	addresses.iter().map(|a| a.to_string()).collect()
}

/// UDP server answering every datagram with the given records.
pub async fn spawn_udp_stub(rcode: ResponseCode, addresses: &[&str]) -> SocketAddr {
	let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
	let addr = socket.local_addr().unwrap();
	let addresses = owned(addresses);
	tokio::spawn(async move {
		let mut buf = vec![0u8; 512];
		loop {
			let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
				break;
			};
			let response = build_response(&buf[..len], rcode, &addresses);
			let _ = socket.send_to(&response, peer).await;
		}
	});
	addr
}

/// UDP server that reads queries and never answers.
pub async fn spawn_silent_udp_stub() -> SocketAddr {
	let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
	let addr = socket.local_addr().unwrap();
	tokio::spawn(async move {
		let mut buf = vec![0u8; 512];
		while socket.recv_from(&mut buf).await.is_ok() {}
	});
	addr
}

/// A loopback UDP port with nothing listening on it.
pub async fn closed_udp_port() -> SocketAddr {
	let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
	socket.local_addr().unwrap()
}

/// TCP server speaking length-prefixed DNS.
pub async fn spawn_tcp_stub(rcode: ResponseCode, addresses: &[&str]) -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let addresses = owned(addresses);
	tokio::spawn(async move {
		while let Ok((mut stream, _)) = listener.accept().await {
			let addresses = addresses.clone();
			tokio::spawn(async move {
				let mut len_buf = [0u8; 2];
				if stream.read_exact(&mut len_buf).await.is_err() {
					return;
				}
				let mut query = vec![0u8; u16::from_be_bytes(len_buf) as usize];
				if stream.read_exact(&mut query).await.is_err() {
					return;
				}
				let response = build_response(&query, rcode, &addresses);
				let mut framed = (response.len() as u16).to_be_bytes().to_vec();
				framed.extend_from_slice(&response);
				let _ = stream.write_all(&framed).await;
			});
		}
	});
	addr
}

/// TCP server that accepts and immediately hangs up.
pub async fn spawn_hangup_tcp_stub() -> SocketAddr {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		while let Ok((stream, _)) = listener.accept().await {
			drop(stream);
		}
	});
	addr
}

/// What a stub DoH endpoint does with each POST.
#[derive(Clone)]
pub enum DohBehavior {
	Answer(Vec<String>),
	Status(StatusCode),
	Garbage,
}

/// Plain-HTTP DoH server mounted at `/dns-query`.
pub async fn spawn_doh_stub(behavior: DohBehavior) -> SocketAddr {
	let app = Router::new().route(
		"/dns-query",
		post(move |body: Bytes| {
			let behavior = behavior.clone();
			async move {
				match behavior {
					DohBehavior::Answer(addresses) => {
						let response = build_response(&body, ResponseCode::NoError, &addresses);
						([(header::CONTENT_TYPE, "application/dns-message")], response).into_response()
					}
					DohBehavior::Status(status) => status.into_response(),
					DohBehavior::Garbage => {
						([(header::CONTENT_TYPE, "application/dns-message")], vec![0u8; 5]).into_response()
					}
				}
			}
		}),
	);
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		let _ = axum::serve(listener, app).await;
	});
	addr
}
