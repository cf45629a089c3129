use std::env;
use std::net::SocketAddr;

use dotenv::dotenv;
use tracing::warn;

/// Runtime configuration, read from the environment with sensible defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP API binds to (`ANALYZEMCP_BIND`).
    pub bind_addr: SocketAddr,
    /// Z-score threshold for the anomaly detector (`ANALYZEMCP_ANOMALY_THRESHOLD`).
    pub anomaly_threshold: f64,
    /// Milliseconds between synthetic feed packets (`ANALYZEMCP_FEED_INTERVAL_MS`).
    pub feed_interval_ms: u64,
    /// Seed for the synthetic feed generator (`ANALYZEMCP_FEED_SEED`).
    pub feed_seed: u64,
    /// Number of snapshots kept for the metric trend lines (`ANALYZEMCP_TREND_WINDOW`).
    pub trend_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_addr: "127.0.0.1:8080".parse().expect("static default address"),
            anomaly_threshold: 0.95,
            feed_interval_ms: 250,
            feed_seed: 0x4D43_5031, // "MCP1"
            trend_window: 60,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = AppConfig::default();

        AppConfig {
            bind_addr: parse_var("ANALYZEMCP_BIND", defaults.bind_addr),
            anomaly_threshold: parse_var("ANALYZEMCP_ANOMALY_THRESHOLD", defaults.anomaly_threshold),
            feed_interval_ms: parse_var("ANALYZEMCP_FEED_INTERVAL_MS", defaults.feed_interval_ms),
            feed_seed: parse_var("ANALYZEMCP_FEED_SEED", defaults.feed_seed),
            trend_window: parse_var("ANALYZEMCP_TREND_WINDOW", defaults.trend_window),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(%name, %raw, "unparseable value, using default");
                default
            }
        },
        Err(_) => default,
    }
}
