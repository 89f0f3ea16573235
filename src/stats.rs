use serde::Serialize;

use crate::transport::QueryResult;

/// Aggregate statistics over a batch of probe results
///
/// Timing fields only consider successful probes. `min_time_ms` and
/// `max_time_ms` stay `None` until a success is seen, so "no successes" is
/// never confused with a genuine 0 ms measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
	pub total_queries: usize,
	pub successful: usize,
	pub failed: usize,
	#[serde(rename = "average_time")]
	pub average_time_ms: f64,
	#[serde(rename = "min_time")]
	pub min_time_ms: Option<u64>,
	#[serde(rename = "max_time")]
	pub max_time_ms: Option<u64>,
}

/// Fold a batch of results into a `Summary` in a single pass.
///
/// Order-independent: any permutation of `results` yields the same summary.
pub fn summarize(results: &[QueryResult]) -> Summary {
	let mut summary = Summary {
		total_queries: results.len(),
		..Summary::default()
	};
	let mut total_time_ms: u64 = 0;

	for result in results {
		if !result.succeeded {
			summary.failed += 1;
			continue;
		}
		let t = result.response_time_ms;
		summary.successful += 1;
		total_time_ms += t;
		summary.min_time_ms = Some(summary.min_time_ms.map_or(t, |min| min.min(t)));
		summary.max_time_ms = Some(summary.max_time_ms.map_or(t, |max| max.max(t)));
	}

	if summary.successful > 0 {
		summary.average_time_ms = total_time_ms as f64 / summary.successful as f64;
	}
	summary
}
