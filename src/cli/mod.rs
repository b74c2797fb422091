//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::models::split_tags;

/// HTTP/1.1 vs HTTP/2 vs HTTP/3 latency benchmark
#[derive(Parser, Debug)]
#[command(name = "httpbench")]
#[command(version)]
#[command(about = "Compare HTTP/1.1, HTTP/2 and HTTP/3 request latency against one URL")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a benchmark
    Run(RunArgs),

    /// Display a saved report
    Show(ShowArgs),

    /// List supported protocols
    List,

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Target URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Requests per protocol
    #[arg(short = 'n', long)]
    pub requests: Option<usize>,

    /// Maximum concurrent requests
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Protocols to test, comma-separated (h1,h2,h3)
    #[arg(short, long)]
    pub protocols: Option<String>,

    /// Directory to save a JSON report in
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (table, json, json-pretty, csv)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// Configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Apply flags given on the command line over `config`
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(requests) = self.requests {
            config.requests = requests;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(protocols) = &self.protocols {
            config.protocols = split_tags(protocols);
        }
        if let Some(output) = &self.output {
            config.output_dir = Some(output.clone());
        }
        if let Some(format) = &self.format {
            config.format = format.clone();
        }
        if let Some(timeout) = self.timeout {
            config.transport.request_timeout_secs = timeout;
        }
        if self.insecure {
            config.transport.insecure = true;
        }
    }
}

/// Arguments for show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Saved report (benchmark_*.json)
    pub path: PathBuf,

    /// Output format (table, json, json-pretty, csv)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        /// Configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Write a default configuration file
    Init {
        /// Destination (.yaml, .yml or .json)
        #[arg(default_value = "httpbench.yaml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Describe supported environment variables
    Env,
}
