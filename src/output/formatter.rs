//! Output formatters for benchmark results
//!
//! Provides Table, JSON and CSV renderings of per-protocol summaries.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;
use std::time::Duration;

use crate::benchmark::{BenchmarkReport, BenchmarkResult};
use crate::models::Protocol;

const HEAVY_RULE: &str = "══════════════════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "─────────────────────────────────────────────────────────────────";
const BOX_WIDTH: usize = 63;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!(
                "unknown output format: {other} (expected table, json, json-pretty or csv)"
            )),
        }
    }
}

/// Render a duration as µs, ms or s with two decimals
pub fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0ms".to_string();
    }
    let nanos = d.as_nanos() as f64;
    if d < Duration::from_millis(1) {
        format!("{:.2}µs", nanos / 1_000.0)
    } else if d < Duration::from_secs(1) {
        format!("{:.2}ms", nanos / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos / 1_000_000_000.0)
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format results of a run
    pub fn format_results(&self, results: &BTreeMap<Protocol, BenchmarkResult>) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.format_table(results)),
            OutputFormat::Json => {
                serde_json::to_string(&by_tag(results)).context("Failed to serialize results")
            }
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&by_tag(results))
                .context("Failed to serialize results"),
            OutputFormat::Csv => self.format_csv(results),
        }
    }

    /// Format a saved report, including its run parameters
    pub fn format_report(&self, report: &BenchmarkReport) -> Result<String> {
        match self.format {
            OutputFormat::Table => {
                let mut output = self.format_run_header(
                    &report.metadata.url,
                    report.metadata.requests,
                    report.metadata.concurrency,
                    &report.results.keys().cloned().collect::<Vec<_>>(),
                );
                let _ = writeln!(output, "Timestamp: {}", report.metadata.timestamp.to_rfc3339());
                output.push_str(&self.format_table(&report.protocol_results()));
                Ok(output)
            }
            OutputFormat::Json => {
                serde_json::to_string(report).context("Failed to serialize report")
            }
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(report).context("Failed to serialize report")
            }
            OutputFormat::Csv => self.format_csv(&report.protocol_results()),
        }
    }

    /// Banner printed before a run
    pub fn format_run_header(
        &self,
        url: &str,
        requests: usize,
        concurrency: usize,
        protocols: &[String],
    ) -> String {
        let mut output = String::new();
        output.push_str(&banner("HTTP Protocol Benchmark Tool (H1, H2, H3)"));
        let _ = writeln!(output, "\nTarget URL: {url}");
        let _ = writeln!(output, "Requests per protocol: {requests}");
        let _ = writeln!(output, "Concurrency: {concurrency}");
        let _ = writeln!(output, "Protocols: {}", protocols.join(","));
        output
    }

    fn format_table(&self, results: &BTreeMap<Protocol, BenchmarkResult>) -> String {
        let mut output = String::new();
        output.push('\n');
        output.push_str(&banner("BENCHMARK RESULTS"));

        for result in results.values() {
            output.push_str(&self.format_protocol_box(result));
        }

        output.push('\n');
        output.push_str(&banner("COMPARISON SUMMARY"));
        output.push('\n');
        output.push_str(&format_comparison(results));

        output.push('\n');
        output.push_str(&banner("RTT ESTIMATION"));
        output.push('\n');
        output.push_str(&format_rtt(results));

        output
    }

    fn format_protocol_box(&self, r: &BenchmarkResult) -> String {
        let mut output = String::new();
        let name = r.protocol.name();
        let title = if self.colorize {
            format!("\x1b[1;36m{name:<BOX_WIDTH$}\x1b[0m")
        } else {
            format!("{name:<BOX_WIDTH$}")
        };

        let _ = writeln!(output, "\n┌{LIGHT_RULE}┐");
        let _ = writeln!(output, "│ {title} │");
        let _ = writeln!(output, "├{LIGHT_RULE}┤");
        output.push_str(&box_line(&format!(
            "Requests: {} total, {} successful, {} failed",
            r.total_requests, r.successful_requests, r.failed_requests
        )));
        output.push_str(&box_line(&format!(
            "Throughput: {:.2} req/sec",
            r.requests_per_second
        )));
        let _ = writeln!(output, "├{LIGHT_RULE}┤");
        for (label, value) in [
            ("DNS Lookup:", r.avg_dns_lookup),
            ("TCP Connect:", r.avg_tcp_connect),
            ("TLS Handshake:", r.avg_tls_handshake),
            ("Time to First Byte:", r.avg_ttfb),
            ("Content Transfer:", r.avg_content_transfer),
        ] {
            output.push_str(&box_line(&format!("{label:<25} {}", format_duration(value))));
        }
        let _ = writeln!(output, "├{LIGHT_RULE}┤");
        for (label, value) in [
            ("Avg Total Time:", r.avg_total_time),
            ("Min Total Time:", r.min_total_time),
            ("Max Total Time:", r.max_total_time),
            ("P50 (Median):", r.p50_total_time),
            ("P95:", r.p95_total_time),
            ("P99:", r.p99_total_time),
        ] {
            output.push_str(&box_line(&format!("{label:<25} {}", format_duration(value))));
        }
        let _ = writeln!(output, "└{LIGHT_RULE}┘");

        output
    }

    fn format_csv(&self, results: &BTreeMap<Protocol, BenchmarkResult>) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for result in results.values() {
            writer.serialize(result).context("Failed to write CSV row")?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
        String::from_utf8(bytes).context("CSV output is not valid UTF-8")
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Side-by-side comparison of the headline metrics, `N/A` for protocols
/// that did not run
pub fn format_comparison(results: &BTreeMap<Protocol, BenchmarkResult>) -> String {
    type Metric = fn(&BenchmarkResult) -> String;
    let rows: [(&str, Metric); 6] = [
        ("Avg Total Time", |r| format_duration(r.avg_total_time)),
        ("Time to First Byte", |r| format_duration(r.avg_ttfb)),
        ("TLS Handshake", |r| format_duration(r.avg_tls_handshake)),
        ("Throughput (req/s)", |r| format!("{:.2}", r.requests_per_second)),
        ("P99 Latency", |r| format_duration(r.p99_total_time)),
        ("Success Rate", |r| format!("{:.1}%", r.success_rate())),
    ];

    let protocols = Protocol::all();
    let header: Vec<String> = std::iter::once("Metric".to_string())
        .chain(protocols.iter().map(|p| short_name(*p).to_string()))
        .collect();
    let rule: Vec<String> = header
        .iter()
        .map(|h| "─".repeat(h.chars().count()))
        .collect();

    let mut table: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 2);
    table.push(header);
    table.push(rule);
    for (label, metric) in rows {
        table.push(
            std::iter::once(label.to_string())
                .chain(
                    protocols
                        .iter()
                        .map(|p| results.get(p).map(metric).unwrap_or_else(|| "N/A".to_string())),
                )
                .collect(),
        );
    }

    let widths: Vec<usize> = (0..table[0].len())
        .map(|col| table.iter().map(|row| row[col].chars().count()).max().unwrap_or(0))
        .collect();

    let mut output = String::new();
    for row in &table {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        let _ = writeln!(output, "{}", line.join("  ").trim_end());
    }
    output
}

/// Round-trip estimate per protocol from its connection setup time
pub fn format_rtt(results: &BTreeMap<Protocol, BenchmarkResult>) -> String {
    let mut output = String::new();
    for (protocol, result) in results {
        let _ = writeln!(
            output,
            "{} estimated RTT: {}",
            protocol.tag(),
            format_duration(result.estimated_rtt())
        );
    }
    output
}

fn short_name(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Http1 => "HTTP/1.1",
        Protocol::Http2 => "HTTP/2",
        Protocol::Http3 => "HTTP/3",
    }
}

fn by_tag(results: &BTreeMap<Protocol, BenchmarkResult>) -> BTreeMap<&'static str, &BenchmarkResult> {
    results.iter().map(|(p, r)| (p.tag(), r)).collect()
}

fn banner(title: &str) -> String {
    format!("╔{HEAVY_RULE}╗\n║{title:^66}║\n╚{HEAVY_RULE}╝\n")
}

fn box_line(content: &str) -> String {
    format!("│ {content:<BOX_WIDTH$} │\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::aggregate;
    use crate::models::{FailureKind, PhaseDurations, TimingResult};

    fn sample(protocol: Protocol) -> BenchmarkResult {
        let phases = PhaseDurations {
            dns_lookup: Duration::from_micros(500),
            tcp_connect: Duration::from_millis(12),
            tls_handshake: Duration::from_millis(30),
            time_to_first_byte: Duration::from_millis(40),
            content_transfer: Duration::from_millis(2),
        };
        let timings = vec![
            TimingResult::success(protocol, phases, Duration::from_millis(80), 200),
            TimingResult::success(protocol, phases, Duration::from_millis(120), 200),
            TimingResult::failure(protocol, FailureKind::Timeout, "timed out", Duration::from_secs(30)),
        ];
        aggregate(protocol, &timings, Duration::from_secs(1))
    }

    fn results(protocols: &[Protocol]) -> BTreeMap<Protocol, BenchmarkResult> {
        protocols.iter().map(|p| (*p, sample(*p))).collect()
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse(), Ok(OutputFormat::Json));
        assert_eq!("TABLE".parse(), Ok(OutputFormat::Table));
        assert_eq!("json-pretty".parse(), Ok(OutputFormat::JsonPretty));
        assert!("unknown".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "0ms");
        assert_eq!(format_duration(Duration::from_nanos(1_500)), "1.50µs");
        assert_eq!(format_duration(Duration::from_micros(12_346)), "12.35ms");
        assert_eq!(format_duration(Duration::from_millis(2_500)), "2.50s");
    }

    #[test]
    fn test_comparison_marks_missing_protocols() {
        let table = format_comparison(&results(&[Protocol::Http1, Protocol::Http3]));
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("Metric"));
        assert!(lines[0].contains("HTTP/2"));
        let throughput = lines.iter().find(|l| l.starts_with("Throughput")).unwrap();
        assert!(throughput.contains("2.00"));
        assert!(throughput.contains("N/A"));
        let success = lines.iter().find(|l| l.starts_with("Success Rate")).unwrap();
        assert!(success.contains("66.7%"));
    }

    #[test]
    fn test_rtt_estimation() {
        let rtt = format_rtt(&results(&[Protocol::Http2, Protocol::Http3]));
        assert!(rtt.contains("h2 estimated RTT: 12.00ms"));
        assert!(rtt.contains("h3 estimated RTT: 15.00ms"));
    }

    #[test]
    fn test_table_output() {
        let formatter = ResultFormatter::new(OutputFormat::Table).no_color();
        let output = formatter.format_results(&results(&[Protocol::Http1])).unwrap();

        assert!(output.contains("BENCHMARK RESULTS"));
        assert!(output.contains("HTTP/1.1"));
        assert!(output.contains("Requests: 3 total, 2 successful, 1 failed"));
        assert!(output.contains("P50 (Median):"));
        assert!(output.contains("RTT ESTIMATION"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_json_output_keyed_by_tag() {
        let formatter = ResultFormatter::new(OutputFormat::Json);
        let output = formatter
            .format_results(&results(&[Protocol::Http1, Protocol::Http2]))
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json["h1"]["failed_requests"], 1);
        assert_eq!(json["h2"]["avg_total_time_ms"], 100.0);
    }

    #[test]
    fn test_csv_output() {
        let formatter = ResultFormatter::new(OutputFormat::Csv);
        let output = formatter
            .format_results(&results(&[Protocol::Http1, Protocol::Http3]))
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("protocol,total_requests,successful_requests"));
        assert!(lines[0].contains("p99_total_time_ms"));
        assert!(lines[1].starts_with("h1,3,2,1"));
        assert!(lines[2].starts_with("h3,"));
    }

    #[test]
    fn test_report_table_includes_metadata() {
        let report = BenchmarkReport::new("https://example.com/api", 3, 2, &results(&[Protocol::Http2]));
        let output = ResultFormatter::new(OutputFormat::Table)
            .no_color()
            .format_report(&report)
            .unwrap();

        assert!(output.contains("Target URL: https://example.com/api"));
        assert!(output.contains("Timestamp:"));
        assert!(output.contains("HTTP/2"));
    }
}
