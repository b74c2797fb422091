//! Benchmark report persistence
//!
//! Saves a run's results with its parameters as a timestamped JSON file.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::metrics::BenchmarkResult;
use crate::models::Protocol;

/// Run parameters stored alongside the results
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub url: String,
    /// Requests per protocol
    pub requests: usize,
    pub concurrency: usize,
    pub timestamp: DateTime<Utc>,
}

/// A saved benchmark run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub metadata: ReportMetadata,
    /// Results keyed by protocol tag
    pub results: BTreeMap<String, BenchmarkResult>,
}

impl BenchmarkReport {
    pub fn new(
        url: impl Into<String>,
        requests: usize,
        concurrency: usize,
        results: &BTreeMap<Protocol, BenchmarkResult>,
    ) -> Self {
        Self {
            metadata: ReportMetadata {
                url: url.into(),
                requests,
                concurrency,
                timestamp: Utc::now(),
            },
            results: results
                .iter()
                .map(|(protocol, result)| (protocol.tag().to_string(), result.clone()))
                .collect(),
        }
    }

    /// Results keyed by protocol; entries with unknown tags are dropped
    pub fn protocol_results(&self) -> BTreeMap<Protocol, BenchmarkResult> {
        self.results
            .iter()
            .filter_map(|(tag, result)| tag.parse().ok().map(|p| (p, result.clone())))
            .collect()
    }

    /// File name derived from the run timestamp
    pub fn file_name(&self) -> String {
        format!(
            "benchmark_{}.json",
            self.metadata.timestamp.format("%Y-%m-%d_%H-%M-%S")
        )
    }

    /// Write the report into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

        let path = dir.join(self.file_name());
        let file = File::create(&path)
            .with_context(|| format!("Failed to create report file: {}", path.display()))?;
        self.write_to(BufWriter::new(file))
            .with_context(|| format!("Failed to save report: {}", path.display()))?;

        info!("Results saved to {}", path.display());
        Ok(path)
    }

    /// Serialize as pretty JSON and flush the writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self).context("Failed to write report")?;
        writer.flush().context("Failed to flush report")?;
        Ok(())
    }

    /// Load a previously saved report
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open report: {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse report: {}", path.display()))
    }
}
