use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;

use crate::output::Report;
use crate::probe::run_probes;
use crate::transport::{ProbeConfig, ServerTarget};

const INDEX_HTML: &str = include_str!("../web/index.html");

/// Shared handler state
#[derive(Debug, Clone, Default)]
pub struct AppState {
	pub probe: ProbeConfig,
}

/// Body of `POST /api/test`
#[derive(Debug, Deserialize)]
pub struct TestRequest {
	#[serde(default)]
	pub domains: Vec<String>,
	#[serde(default)]
	pub servers: Vec<ServerTarget>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/", get(index))
		.route("/api/test", post(run_test))
		.route("/api/report", any(report))
		.with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
///
/// Go-style ":8080" addresses listen on all interfaces.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
	let bind = bind_address(addr);
	let listener = TcpListener::bind(&bind)
		.await
		.with_context(|| format!("failed to bind server address '{}'", bind))?;
	info!(addr = %listener.local_addr()?, "Server listening");

	axum::serve(listener, router(state))
		.with_graceful_shutdown(shutdown_signal())
		.await
		.context("server error")?;
	Ok(())
}

fn bind_address(addr: &str) -> String {
	if addr.starts_with(':') {
		format!("0.0.0.0{}", addr)
	} else {
		addr.to_string()
	}
}

async fn shutdown_signal() {
	let _ = tokio::signal::ctrl_c().await;
	info!("Shutting down server");
}

async fn index() -> Html<&'static str> {
	Html(INDEX_HTML)
}

async fn run_test(
	State(state): State<AppState>,
	payload: Result<Json<TestRequest>, JsonRejection>,
) -> Response {
	let Json(request) = match payload {
		Ok(payload) => payload,
		Err(rejection) => {
			return (StatusCode::BAD_REQUEST, format!("Invalid request: {}", rejection.body_text()))
				.into_response();
		}
	};

	if request.domains.is_empty() {
		return (StatusCode::BAD_REQUEST, "At least one domain is required").into_response();
	}
	if request.servers.is_empty() {
		return (StatusCode::BAD_REQUEST, "At least one server is required").into_response();
	}

	info!(
		domains = request.domains.len(),
		servers = request.servers.len(),
		"Running test request"
	);
	let results = run_probes(&request.servers, &request.domains, &state.probe, |_| {}).await;
	Json(Report::new(results)).into_response()
}

async fn report() -> (StatusCode, &'static str) {
	(StatusCode::NOT_IMPLEMENTED, "Not implemented")
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::time::Duration;

	use axum::body::Body;
	use axum::http::{header, Method, Request};
	use hickory_proto::op::ResponseCode;
	use http_body_util::BodyExt;
	use tower::ServiceExt;

	use crate::testutil::spawn_udp_stub;

	fn app() -> Router {
		router(AppState {
			probe: ProbeConfig {
				timeout: Duration::from_secs(2),
				max_inflight: 2,
			},
		})
	}

	fn post_json(uri: &str, body: String) -> Request<Body> {
		Request::builder()
			.method(Method::POST)
			.uri(uri)
			.header(header::CONTENT_TYPE, "application/json")
			.body(Body::from(body))
			.unwrap()
	}

	async fn body_text(response: Response) -> String {
		let bytes = response.into_body().collect().await.unwrap().to_bytes();
		String::from_utf8(bytes.to_vec()).unwrap()
	}

	#[test]
	fn test_bind_address() {
		assert_eq!(bind_address(":8080"), "0.0.0.0:8080");
		assert_eq!(bind_address("127.0.0.1:9000"), "127.0.0.1:9000");
	}

	#[tokio::test]
	async fn test_index_page() {
		let response = app()
			.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert!(body_text(response).await.contains("/api/test"));
	}

	#[tokio::test]
	async fn test_index_rejects_post() {
		let response = app()
			.oneshot(Request::builder().method(Method::POST).uri("/").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
	}

	#[tokio::test]
	async fn test_api_test_runs_batch() {
		let addr = spawn_udp_stub(ResponseCode::NoError, &["93.184.216.34"]).await;
		let body = serde_json::json!({
			"domains": ["example.com"],
			"servers": [
				{"name": "Stub", "address": addr.to_string(), "protocols": ["udp", "quic"]}
			]
		});
		let response = app()
			.oneshot(post_json("/api/test", body.to_string()))
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);

		let value: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
		let results = value["results"].as_array().unwrap();
		assert_eq!(results.len(), 2);
		assert_eq!(results[0]["server_name"], "Stub");
		assert_eq!(results[0]["success"], true);
		assert_eq!(results[0]["response_ips"][0], "93.184.216.34");
		assert_eq!(results[1]["success"], false);
		assert_eq!(results[1]["error"], "unsupported protocol: quic");

		let summary = &value["summary"];
		assert_eq!(summary["total_queries"], 2);
		assert_eq!(summary["successful"], 1);
		assert_eq!(summary["failed"], 1);
		assert!(summary["min_time"].is_u64());
	}

	#[tokio::test]
	async fn test_api_test_requires_domains() {
		let body = r#"{"domains": [], "servers": [{"name": "a", "address": "1.1.1.1", "protocols": ["udp"]}]}"#;
		let response = app().oneshot(post_json("/api/test", body.to_string())).await.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert_eq!(body_text(response).await, "At least one domain is required");
	}

	#[tokio::test]
	async fn test_api_test_requires_servers() {
		let body = r#"{"domains": ["example.com"]}"#;
		let response = app().oneshot(post_json("/api/test", body.to_string())).await.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert_eq!(body_text(response).await, "At least one server is required");
	}

	#[tokio::test]
	async fn test_api_test_malformed_json() {
		let response = app().oneshot(post_json("/api/test", "{not json".to_string())).await.unwrap();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);
		assert!(body_text(response).await.starts_with("Invalid request:"));
	}

	#[tokio::test]
	async fn test_api_test_rejects_get() {
		let response = app()
			.oneshot(Request::builder().uri("/api/test").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
	}

	#[tokio::test]
	async fn test_report_not_implemented() {
		let response = app()
			.oneshot(Request::builder().uri("/api/report").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
	}
}
