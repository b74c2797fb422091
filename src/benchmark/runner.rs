//! Benchmark orchestration
//!
//! Runs each requested protocol in turn against the same URL and collects one
//! summary per protocol.

use http::Uri;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::metrics::{aggregate, BenchmarkResult};
use crate::executor::ParallelExecutor;
use crate::http::{ClientError, ProtocolClient, TransportSettings};
use crate::models::Protocol;

/// Benchmark runner
pub struct BenchmarkRunner {
    settings: TransportSettings,
}

impl BenchmarkRunner {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }

    /// Benchmark every protocol named in `tags`, one after another.
    ///
    /// Unsupported tags and protocols whose transport cannot be set up are
    /// logged and left out of the result. Repeated tags run once.
    pub async fn run_all(
        &self,
        url: &Uri,
        tags: &[String],
        total: usize,
        concurrency: usize,
    ) -> BTreeMap<Protocol, BenchmarkResult> {
        let mut results = BTreeMap::new();

        for tag in tags {
            let client = match ProtocolClient::create(tag, &self.settings) {
                Ok(client) => client,
                Err(ClientError::UnsupportedProtocol(e)) => {
                    warn!("Skipping {}: {}", tag, e);
                    continue;
                }
                Err(e) => {
                    warn!("Skipping {}: transport setup failed: {}", tag, e);
                    continue;
                }
            };

            let protocol = client.protocol();
            if results.contains_key(&protocol) {
                warn!("{} already benchmarked, ignoring repeated tag", protocol.name());
                if let Err(e) = client.close().await {
                    warn!("Failed to close {} client: {}", protocol.name(), e);
                }
                continue;
            }

            let result = self.run_protocol(client, url, total, concurrency).await;
            results.insert(protocol, result);
        }

        results
    }

    /// Run one protocol batch and release its transport
    pub async fn run_protocol(
        &self,
        client: ProtocolClient,
        url: &Uri,
        total: usize,
        concurrency: usize,
    ) -> BenchmarkResult {
        let protocol = client.protocol();
        info!(
            "Benchmarking {} ({} requests, {} concurrent)",
            protocol.name(),
            total,
            concurrency
        );

        let client = Arc::new(client);
        let executor = ParallelExecutor::new(concurrency);
        let batch = executor.run(client.clone(), url, total).await;

        if let Err(e) = client.close().await {
            warn!("Failed to close {} client: {}", protocol.name(), e);
        }

        let result = aggregate(protocol, &batch.results, batch.elapsed);
        info!(
            "{} finished: {}/{} succeeded in {:.2}s",
            protocol.name(),
            result.successful_requests,
            result.total_requests,
            batch.elapsed.as_secs_f64()
        );

        result
    }
}

/// Requested tags that produced no result, either because they name no
/// supported protocol or because their transport could not be set up.
/// Repeats of a benchmarked protocol are not counted.
pub fn unmatched_tags(tags: &[String], results: &BTreeMap<Protocol, BenchmarkResult>) -> Vec<String> {
    let mut unmatched: Vec<String> = Vec::new();
    for tag in tags {
        let matched = tag
            .parse::<Protocol>()
            .map(|p| results.contains_key(&p))
            .unwrap_or(false);
        let tag = tag.trim().to_string();
        if !matched && !unmatched.contains(&tag) {
            unmatched.push(tag);
        }
    }
    unmatched
}

impl Default for BenchmarkRunner {
    fn default() -> Self {
        Self::new(TransportSettings::default())
    }
}
