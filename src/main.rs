//! httpbench - HTTP protocol generation benchmark
//!
//! Measures request latency of HTTP/1.1, HTTP/2 and HTTP/3 against a single
//! URL, breaking every request into DNS, connect, handshake, first byte and
//! transfer phases.
//!
//! ## Usage
//!
//! ```bash
//! # Benchmark all three protocols with defaults
//! httpbench run -u https://example.com/api
//!
//! # 500 requests per protocol, 50 in flight, HTTP/2 and HTTP/3 only
//! httpbench run -n 500 -c 50 -p h2,h3 -o results
//!
//! # Display a saved report as CSV
//! httpbench show results/benchmark_2024-03-09_14-05-07.json -f csv
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

mod benchmark;
mod cli;
mod config;
mod executor;
mod http;
mod models;
mod output;
mod utils;

use benchmark::{unmatched_tags, BenchmarkReport, BenchmarkRunner};
use cli::{Args, Command, ConfigAction};
use config::{AppConfig, EnvConfig};
use models::Protocol;
use output::{OutputFormat, ResultFormatter};
use utils::logger::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();

    match args.command {
        Command::Run(run_args) => {
            let mut config = AppConfig::resolve(run_args.config.as_deref(), &env)?;
            run_args.apply(&mut config);
            init_logging(args.verbose, &config.log_level);
            run_benchmark(config).await?;
        }
        Command::Show(show_args) => {
            init_logging(args.verbose, env.log_level.as_deref().unwrap_or("info"));
            show_report(show_args)?;
        }
        Command::List => {
            list_protocols();
        }
        Command::Config(config_args) => {
            init_logging(args.verbose, env.log_level.as_deref().unwrap_or("info"));
            manage_config(config_args.action, &env)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, level: &str) {
    let level = if verbose {
        LogLevel::Debug
    } else {
        level.parse().unwrap_or(LogLevel::Info)
    };
    init_logger(level);
}

async fn run_benchmark(config: AppConfig) -> Result<()> {
    config.validate()?;
    let target = config.target()?;
    let format = config.output_format()?;
    let formatter = ResultFormatter::new(format);

    if format == OutputFormat::Table {
        print!(
            "{}",
            formatter.format_run_header(
                &config.url,
                config.requests,
                config.concurrency,
                &config.protocols
            )
        );
    }

    let runner = BenchmarkRunner::new(config.transport.clone());
    let results = runner
        .run_all(&target, &config.protocols, config.requests, config.concurrency)
        .await;

    if results.is_empty() {
        anyhow::bail!(
            "No protocol could be benchmarked (requested: {})",
            config.protocols.join(",")
        );
    }

    println!("{}", formatter.format_results(&results)?);

    if let Some(dir) = &config.output_dir {
        let report = BenchmarkReport::new(&config.url, config.requests, config.concurrency, &results);
        let path = report.save(dir)?;
        println!("\nResults saved to: {}", path.display());
    }

    let skipped = unmatched_tags(&config.protocols, &results);
    if !skipped.is_empty() {
        warn!("Protocol tag(s) produced no results: {}", skipped.join(","));
    }

    Ok(())
}

fn show_report(args: cli::ShowArgs) -> Result<()> {
    let format: OutputFormat = args.format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let report = BenchmarkReport::load(&args.path)?;
    info!(
        "Loaded report for {} ({} protocols)",
        report.metadata.url,
        report.results.len()
    );

    println!("{}", ResultFormatter::new(format).format_report(&report)?);
    Ok(())
}

fn list_protocols() {
    println!("\nSupported Protocols:");
    println!("─────────────────────────────────────────");
    for protocol in Protocol::all() {
        println!(
            "  {:3} {:15} {}",
            protocol.tag(),
            protocol.name(),
            protocol.transport()
        );
    }
}

fn manage_config(action: ConfigAction, env: &EnvConfig) -> Result<()> {
    match action {
        ConfigAction::Show { config } => {
            let config = AppConfig::resolve(config.as_deref(), env)?;
            let yaml = serde_yaml::to_string(&config).context("Failed to serialize config")?;
            println!("{yaml}");
        }
        ConfigAction::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            AppConfig::default().save(&path)?;
            println!("Configuration written to {}", path.display());
        }
        ConfigAction::Env => {
            config::env::print_env_help();
            println!();
            env.print_summary();
        }
    }

    Ok(())
}
