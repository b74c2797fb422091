//! Bounded-concurrency request scheduling
//!
//! Runs a fixed number of requests with at most `max_concurrent` in flight.
//! A permit is taken before each task is spawned, so new requests start as
//! soon as capacity frees up.

use futures::future::join_all;
use http::Uri;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, warn};

use super::request::execute;
use crate::http::ProtocolClient;
use crate::models::{FailureKind, Protocol, TimingResult};
use crate::utils::timer::Timer;

/// Results of one protocol batch
#[derive(Debug)]
pub struct Batch {
    /// One result per launched request, in completion order
    pub results: Vec<TimingResult>,
    /// Wall-clock time around the whole batch
    pub elapsed: Duration,
}

/// Parallel request executor
pub struct ParallelExecutor {
    max_concurrent: usize,
}

impl ParallelExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run `total` GET requests against `url` through a shared client
    pub async fn run(&self, client: Arc<ProtocolClient>, url: &Uri, total: usize) -> Batch {
        let protocol = client.protocol();
        let url = Arc::new(url.clone());

        self.run_with(protocol, total, move |index| {
            let client = client.clone();
            let url = url.clone();
            async move {
                let result = execute(&client, &url).await;
                if index == 0 {
                    if let Some(kind) = result.failure_kind() {
                        warn!(
                            "{} sample error ({}): {:?}",
                            result.protocol.name(),
                            kind,
                            result.outcome
                        );
                    }
                }
                result
            }
        })
        .await
    }

    /// Run `total` tasks produced by `task`, never more than
    /// `max_concurrent` at once. Every task runs to completion.
    pub async fn run_with<F, Fut>(&self, protocol: Protocol, total: usize, task: F) -> Batch
    where
        F: Fn(usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TimingResult> + Send + 'static,
    {
        let limit = self.max_concurrent.min(total).max(1);
        let semaphore = Arc::new(Semaphore::new(limit));
        let results = Arc::new(Mutex::new(Vec::with_capacity(total)));
        let task = Arc::new(task);

        debug!(
            "Dispatching {} {} requests ({} concurrent)",
            total,
            protocol.name(),
            limit
        );

        let timer = Timer::start(format!("{} batch", protocol.name()));
        let mut handles = Vec::with_capacity(total);

        for index in 0..total {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let results = results.clone();
            let task = task.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let result = task(index).await;
                results.lock().await.push(result);
            }));
        }

        let joined = join_all(handles).await;
        let elapsed = timer.stop();

        let mut results = std::mem::take(&mut *results.lock().await);
        for error in joined.into_iter().filter_map(Result::err) {
            warn!("{} worker aborted: {}", protocol.name(), error);
            results.push(TimingResult::failure(
                protocol,
                FailureKind::Transport,
                format!("worker aborted: {error}"),
                Duration::ZERO,
            ));
        }

        Batch { results, elapsed }
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::spawn_server;
    use crate::http::TransportSettings;
    use crate::models::PhaseDurations;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ok(protocol: Protocol, ms: u64) -> TimingResult {
        TimingResult::success(protocol, PhaseDurations::default(), Duration::from_millis(ms), 200)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_max_concurrent() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let executor = ParallelExecutor::new(5);
        let (active, high) = (in_flight.clone(), peak.clone());
        let batch = executor
            .run_with(Protocol::Http1, 50, move |_| {
                let active = active.clone();
                let high = high.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    high.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    ok(Protocol::Http1, 5)
                }
            })
            .await;

        assert_eq!(batch.results.len(), 50);
        assert!(peak.load(Ordering::SeqCst) <= 5);
        assert_eq!(peak.load(Ordering::SeqCst), 5);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failures_do_not_cancel_batch() {
        let executor = ParallelExecutor::new(3);
        let batch = executor
            .run_with(Protocol::Http2, 10, |index| async move {
                if index % 2 == 0 {
                    TimingResult::failure(
                        Protocol::Http2,
                        FailureKind::Connect,
                        "refused",
                        Duration::from_millis(1),
                    )
                } else {
                    ok(Protocol::Http2, 10)
                }
            })
            .await;

        assert_eq!(batch.results.len(), 10);
        assert_eq!(batch.results.iter().filter(|r| r.is_success()).count(), 5);
    }

    #[tokio::test]
    async fn test_panicking_worker_is_counted_as_failure() {
        let executor = ParallelExecutor::new(2);
        let batch = executor
            .run_with(Protocol::Http1, 4, |index| async move {
                if index == 3 {
                    panic!("worker exploded");
                }
                ok(Protocol::Http1, 1)
            })
            .await;

        assert_eq!(batch.results.len(), 4);
        let failed: Vec<_> = batch.results.iter().filter(|r| !r.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].failure_kind(), Some(FailureKind::Transport));
    }

    #[tokio::test]
    async fn test_zero_requests() {
        let batch = ParallelExecutor::new(4)
            .run_with(Protocol::Http3, 0, |_| async { ok(Protocol::Http3, 1) })
            .await;
        assert!(batch.results.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_against_server() {
        let server = spawn_server(200, "payload", Duration::from_millis(2)).await;
        let client = Arc::new(ProtocolClient::create("h1", &TransportSettings::default()).unwrap());
        let url: Uri = server.url("/").parse().unwrap();

        let batch = ParallelExecutor::new(4).run(client.clone(), &url, 20).await;

        assert_eq!(batch.results.len(), 20);
        assert!(batch.results.iter().all(|r| r.is_success()));
        assert!(batch.elapsed > Duration::ZERO);
        assert!(server.connections() <= 4);
        client.close().await.unwrap();
    }
}
