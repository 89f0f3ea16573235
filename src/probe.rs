use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::transport::{ProbeConfig, Protocol, QueryResult, ServerTarget, QUERY_TIMEOUT};

/// Probe one (server, domain, protocol) triple with the standard timeout.
///
/// Never fails: every outcome, including an unrecognized protocol, comes
/// back as a `QueryResult`.
#[cfg_attr(not(test), allow(dead_code))]
pub async fn dispatch(server: &ServerTarget, domain: &str, protocol: &str) -> QueryResult {
	dispatch_with_timeout(server, domain, protocol, QUERY_TIMEOUT).await
}

/// Same as [`dispatch`] with an explicit per-probe budget.
///
/// The response time covers everything from protocol selection to the end
/// of the exchange, so failed and timed-out probes report a duration too.
pub async fn dispatch_with_timeout(
	server: &ServerTarget,
	domain: &str,
	protocol: &str,
	timeout: Duration,
) -> QueryResult {
	let start = Instant::now();

	// Unknown protocols fail here without touching the network
	let outcome = match protocol.parse::<Protocol>() {
		Ok(protocol) => protocol.resolve(&server.address, domain, timeout).await,
		Err(e) => Err(e),
	};
	let response_time_ms = start.elapsed().as_millis() as u64;

	let (response_addresses, error) = match outcome {
		Ok(addresses) => (addresses, None),
		Err(e) => (Vec::new(), Some(e.to_string())),
	};

	QueryResult {
		server_name: server.name.clone(),
		server_address: server.address.clone(),
		domain: domain.to_string(),
		protocol: protocol.to_string(),
		response_addresses,
		response_time_ms,
		succeeded: error.is_none(),
		error,
	}
}

/// A single probe task: server + domain + protocol
#[derive(Clone, Debug)]
struct ProbeTask {
	server: Arc<ServerTarget>,
	domain: String,
	protocol: String,
}

impl ProbeTask {
	/// Result recorded when the task itself dies before producing one.
	fn failed(&self, error: String) -> QueryResult {
		QueryResult {
			server_name: self.server.name.clone(),
			server_address: self.server.address.clone(),
			domain: self.domain.clone(),
			protocol: self.protocol.clone(),
			response_addresses: Vec::new(),
			response_time_ms: 0,
			succeeded: false,
			error: Some(error),
		}
	}
}

/// Run every server x domain x protocol probe and collect the results.
///
/// Probes run on a pool bounded by `config.max_inflight` (1 keeps the strict
/// one-after-another behavior). `on_result` sees each result as soon as it
/// and every earlier probe have finished. The function returns only once
/// every probe has finished, with results in server, domain, protocol order.
pub async fn run_probes<F>(
	servers: &[ServerTarget],
	domains: &[String],
	config: &ProbeConfig,
	mut on_result: F,
) -> Vec<QueryResult>
where
	F: FnMut(&QueryResult),
{
	// Build the list of all probe tasks
	let mut tasks: Vec<ProbeTask> = Vec::new();
	for server in servers {
		let shared = Arc::new(server.clone());
		for domain in domains {
			for protocol in &server.protocols {
				tasks.push(ProbeTask {
					server: shared.clone(),
					domain: domain.clone(),
					protocol: protocol.clone(),
				});
			}
		}
	}

	let max_inflight = config.max_inflight.max(1);
	info!(
		probes = tasks.len(),
		servers = servers.len(),
		domains = domains.len(),
		max_inflight,
		"Starting probe run"
	);

	let semaphore = Arc::new(Semaphore::new(max_inflight));
	let mut handles = Vec::with_capacity(tasks.len());
	for task in tasks {
		let sem = semaphore.clone();
		let timeout = config.timeout;
		let probe = task.clone();

		let handle = tokio::spawn(async move {
			// Held until the probe completes
			let _permit = sem.acquire_owned().await;
			dispatch_with_timeout(&probe.server, &probe.domain, &probe.protocol, timeout).await
		});
		handles.push((task, handle));
	}

	// Barrier: wait for every probe before handing the batch back
	let mut results = Vec::with_capacity(handles.len());
	for (task, handle) in handles {
		let result = match handle.await {
			Ok(result) => result,
			Err(e) => {
				warn!(server = %task.server.name, domain = %task.domain, protocol = %task.protocol, error = %e, "Probe task failed");
				task.failed(format!("probe task failed: {}", e))
			}
		};
		debug!(
			server = %result.server_name,
			domain = %result.domain,
			protocol = %result.protocol,
			success = result.succeeded,
			response_time_ms = result.response_time_ms,
			"Probe finished"
		);
		on_result(&result);
		results.push(result);
	}

	let failed = results.iter().filter(|r| !r.succeeded).count();
	info!(probes = results.len(), failed, "Probe run complete");
	results
}
