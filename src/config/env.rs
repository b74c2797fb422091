//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::str::FromStr;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "HTTPBENCH";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnvConfig {
    /// Target URL from HTTPBENCH_URL
    pub url: Option<String>,
    /// Requests per protocol from HTTPBENCH_REQUESTS
    pub requests: Option<usize>,
    /// Concurrency from HTTPBENCH_CONCURRENCY
    pub concurrency: Option<usize>,
    /// Comma-separated tags from HTTPBENCH_PROTOCOLS
    pub protocols: Option<String>,
    /// Report directory from HTTPBENCH_OUTPUT
    pub output_dir: Option<String>,
    /// Output format from HTTPBENCH_FORMAT
    pub format: Option<String>,
    /// Request timeout in seconds from HTTPBENCH_TIMEOUT
    pub timeout: Option<u64>,
    /// Skip certificate verification from HTTPBENCH_INSECURE
    pub insecure: Option<bool>,
    /// Log level from HTTPBENCH_LOG
    pub log_level: Option<String>,
    /// Config file from HTTPBENCH_CONFIG
    pub config_file: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup keyed by full variable name
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}_{name}")).filter(|v| !v.is_empty());

        Self {
            url: get("URL"),
            requests: parse(get("REQUESTS")),
            concurrency: parse(get("CONCURRENCY")),
            protocols: get("PROTOCOLS"),
            output_dir: get("OUTPUT"),
            format: get("FORMAT"),
            timeout: parse(get("TIMEOUT")),
            insecure: get("INSECURE").map(|v| parse_bool(&v)),
            log_level: get("LOG"),
            config_file: get("CONFIG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        *self != Self::default()
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_URL:          {:?}", ENV_PREFIX, self.url);
        println!("  {}_REQUESTS:     {:?}", ENV_PREFIX, self.requests);
        println!("  {}_CONCURRENCY:  {:?}", ENV_PREFIX, self.concurrency);
        println!("  {}_PROTOCOLS:    {:?}", ENV_PREFIX, self.protocols);
        println!("  {}_OUTPUT:       {:?}", ENV_PREFIX, self.output_dir);
        println!("  {}_FORMAT:       {:?}", ENV_PREFIX, self.format);
        println!("  {}_TIMEOUT:      {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_INSECURE:     {:?}", ENV_PREFIX, self.insecure);
        println!("  {}_LOG:          {:?}", ENV_PREFIX, self.log_level);
        println!("  {}_CONFIG:       {:?}", ENV_PREFIX, self.config_file);
    }
}

fn parse<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

/// Print all HTTPBENCH environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_URL          Target URL");
    println!("  {ENV_PREFIX}_REQUESTS     Requests per protocol");
    println!("  {ENV_PREFIX}_CONCURRENCY  Maximum concurrent requests");
    println!("  {ENV_PREFIX}_PROTOCOLS    Protocols to test (h1,h2,h3)");
    println!("  {ENV_PREFIX}_OUTPUT       Directory for JSON reports");
    println!("  {ENV_PREFIX}_FORMAT       Output format (table, json, json-pretty, csv)");
    println!("  {ENV_PREFIX}_TIMEOUT      Request timeout in seconds");
    println!("  {ENV_PREFIX}_INSECURE     Skip TLS certificate verification (true/false)");
    println!("  {ENV_PREFIX}_LOG          Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_CONFIG       Path to configuration file");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_URL=https://localhost:8443/");
    println!("  export {ENV_PREFIX}_PROTOCOLS=h2,h3");
    println!("  httpbench run -n 500 -c 50");
}
