use std::error::Error;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossbeam_channel::unbounded;
use tracing_subscriber::EnvFilter;

use analyzemcp::analyzer::McpAnalyzer;
use analyzemcp::config::AppConfig;
use analyzemcp::dashboard;
use analyzemcp::feed;
use analyzemcp::insights::MetricHistory;
use analyzemcp::server;
use analyzemcp::stats::ProtocolStats;

#[derive(Parser)]
#[command(
    name = "analyzemcp",
    about = "Machine Control Protocol analysis dashboard and API"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Live terminal dashboard fed by the synthetic packet source
    Dash {
        /// Milliseconds between generated packets
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// HTTP analysis API: POST /analyze, GET /health, GET /metrics
    Serve {
        /// Bind address, e.g. 127.0.0.1:8080
        #[arg(long)]
        bind: Option<String>,
    },
    /// Analyze the built-in sample once, print the report and exit
    Analyze,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // stderr so log lines stay out of the dashboard's screen
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::from_env();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Dash { interval_ms: None }) {
        Command::Dash { interval_ms } => {
            if let Some(ms) = interval_ms {
                config.feed_interval_ms = ms;
            }
            run_dash(config)
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind.parse()?;
            }
            server::serve(config).await
        }
        Command::Analyze => run_sample_analysis(config),
    }
}

fn run_dash(config: AppConfig) -> Result<(), Box<dyn Error>> {
    let (tx, rx) = unbounded();
    let producer = feed::start_feed(
        Duration::from_millis(config.feed_interval_ms),
        config.feed_seed,
        tx,
    );

    dashboard::run_dashboard(rx, config.anomaly_threshold, config.trend_window)?;

    // the producer stops once the dashboard drops the receiver
    let _ = producer.join();
    Ok(())
}

/// Composition root for the fixed sample: two records (MCP-1 at 100 bytes,
/// MCP-2 at 150 bytes) aggregated and run through the insight generator.
fn run_sample_analysis(config: AppConfig) -> Result<(), Box<dyn Error>> {
    let records = feed::sample_records();
    let stats = ProtocolStats::from_records(&records);

    let mut analyzer = McpAnalyzer::new(config.anomaly_threshold);
    let packets: Vec<_> = feed::sample_frames()
        .iter()
        .map(|frame| analyzer.analyze_packet(frame))
        .collect();

    let mut history = MetricHistory::new(config.trend_window);
    history.record(&stats, 0);
    let result = server::analysis_result(&history, &stats);

    let report = serde_json::json!({
        "packets": packets,
        "stats": stats,
        "dashboard": result,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
