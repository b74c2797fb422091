//! Performance metrics aggregation
//!
//! Folds a batch of per-request timings into one summary per protocol.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::{Protocol, TimingResult};

/// Summary of one protocol batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub protocol: Protocol,
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,

    #[serde(rename = "avg_dns_lookup_ms", with = "duration_ms")]
    pub avg_dns_lookup: Duration,
    #[serde(rename = "avg_tcp_connect_ms", with = "duration_ms")]
    pub avg_tcp_connect: Duration,
    #[serde(rename = "avg_tls_handshake_ms", with = "duration_ms")]
    pub avg_tls_handshake: Duration,
    #[serde(rename = "avg_ttfb_ms", with = "duration_ms")]
    pub avg_ttfb: Duration,
    #[serde(rename = "avg_content_transfer_ms", with = "duration_ms")]
    pub avg_content_transfer: Duration,
    #[serde(rename = "avg_total_time_ms", with = "duration_ms")]
    pub avg_total_time: Duration,

    #[serde(rename = "min_total_time_ms", with = "duration_ms")]
    pub min_total_time: Duration,
    #[serde(rename = "max_total_time_ms", with = "duration_ms")]
    pub max_total_time: Duration,
    #[serde(rename = "p50_total_time_ms", with = "duration_ms")]
    pub p50_total_time: Duration,
    #[serde(rename = "p95_total_time_ms", with = "duration_ms")]
    pub p95_total_time: Duration,
    #[serde(rename = "p99_total_time_ms", with = "duration_ms")]
    pub p99_total_time: Duration,

    pub requests_per_second: f64,
}

impl BenchmarkResult {
    /// Share of successful requests, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64 * 100.0
    }

    /// Rough round-trip estimate from connection setup.
    ///
    /// TCP connect takes one round trip; QUIC folds transport and TLS setup
    /// into a handshake of roughly two.
    pub fn estimated_rtt(&self) -> Duration {
        match self.protocol {
            Protocol::Http1 | Protocol::Http2 => self.avg_tcp_connect,
            Protocol::Http3 => self.avg_tls_handshake / 2,
        }
    }
}

/// Aggregate a batch into a `BenchmarkResult`.
///
/// Failed requests are counted but excluded from every timing figure.
pub fn aggregate(
    protocol: Protocol,
    results: &[TimingResult],
    batch_duration: Duration,
) -> BenchmarkResult {
    let successful: Vec<&TimingResult> = results.iter().filter(|r| r.is_success()).collect();
    let n = successful.len();

    let mean = |phase: fn(&TimingResult) -> Duration| -> Duration {
        if n == 0 {
            return Duration::ZERO;
        }
        let sum: u128 = successful.iter().map(|r| phase(r).as_nanos()).sum();
        nanos(sum / n as u128)
    };

    let mut totals: Vec<Duration> = successful.iter().map(|r| r.total_time).collect();
    totals.sort_unstable();

    let requests_per_second = if batch_duration.is_zero() {
        0.0
    } else {
        n as f64 / batch_duration.as_secs_f64()
    };

    BenchmarkResult {
        protocol,
        total_requests: results.len(),
        successful_requests: n,
        failed_requests: results.len() - n,
        avg_dns_lookup: mean(|r| r.phases.dns_lookup),
        avg_tcp_connect: mean(|r| r.phases.tcp_connect),
        avg_tls_handshake: mean(|r| r.phases.tls_handshake),
        avg_ttfb: mean(|r| r.phases.time_to_first_byte),
        avg_content_transfer: mean(|r| r.phases.content_transfer),
        avg_total_time: mean(|r| r.total_time),
        min_total_time: totals.first().copied().unwrap_or_default(),
        max_total_time: totals.last().copied().unwrap_or_default(),
        p50_total_time: percentile(&totals, 50.0),
        p95_total_time: percentile(&totals, 95.0),
        p99_total_time: percentile(&totals, 99.0),
        requests_per_second,
    }
}

/// Nearest-rank percentile over ascending samples: index `floor(p * n / 100)`
/// clamped to the last element. Zero for an empty slice.
pub fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((p * sorted.len() as f64) / 100.0).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn nanos(n: u128) -> Duration {
    Duration::from_nanos(u64::try_from(n).unwrap_or(u64::MAX))
}

/// Serialize durations as fractional milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_nanos() as f64 / 1_000_000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        if !ms.is_finite() || ms < 0.0 {
            return Err(serde::de::Error::custom(format!("invalid duration: {ms}ms")));
        }
        Ok(Duration::from_nanos((ms * 1_000_000.0).round() as u64))
    }
}
