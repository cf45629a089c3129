use std::collections::VecDeque;

use chrono::Utc;

use crate::analyzer::UNKNOWN_PROTOCOL;
use crate::models::domain::{AnalysisMetric, DashboardData};
use crate::stats::ProtocolStats;

/// Rolling window of aggregate snapshots backing the metric-card trend lines.
pub struct MetricHistory {
    capacity: usize,
    snapshots: VecDeque<Snapshot>,
}

#[derive(Debug, Clone)]
struct Snapshot {
    label: String,
    total_packets: f64,
    average_size: f64,
    protocols_seen: f64,
    anomaly_rate: f64,
}

impl MetricHistory {
    pub fn new(capacity: usize) -> Self {
        MetricHistory {
            capacity: capacity.max(1),
            snapshots: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Record the current aggregate state as one trend point.
    pub fn record(&mut self, stats: &ProtocolStats, anomalies: u64) {
        self.record_labeled(Utc::now().format("%H:%M:%S").to_string(), stats, anomalies);
    }

    pub fn record_labeled(&mut self, label: String, stats: &ProtocolStats, anomalies: u64) {
        let anomaly_rate = if stats.total_packets == 0 {
            0.0
        } else {
            anomalies as f64 / stats.total_packets as f64 * 100.0
        };

        self.snapshots.push_back(Snapshot {
            label,
            total_packets: stats.total_packets as f64,
            average_size: stats.average_size,
            protocols_seen: stats.protocols_seen() as f64,
            anomaly_rate,
        });
        if self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
    }

    /// The four dashboard metric cards, in fixed order, each carrying the
    /// full trend series and the percent change against the previous snapshot.
    pub fn metrics(&self) -> Vec<AnalysisMetric> {
        let card = |title: &str, select: fn(&Snapshot) -> f64| {
            let data: Vec<(String, f64)> = self
                .snapshots
                .iter()
                .map(|s| (s.label.clone(), select(s)))
                .collect();
            let value = self.snapshots.back().map(select).unwrap_or(0.0);
            let previous = if self.snapshots.len() >= 2 {
                self.snapshots.get(self.snapshots.len() - 2).map(select)
            } else {
                None
            };
            AnalysisMetric {
                title: title.to_string(),
                value,
                change: percent_change(previous, value),
                data,
            }
        };

        vec![
            card("Total Packets", |s| s.total_packets),
            card("Average Packet Size", |s| s.average_size),
            card("Protocols Seen", |s| s.protocols_seen),
            card("Anomaly Rate", |s| s.anomaly_rate),
        ]
    }
}

fn percent_change(previous: Option<f64>, current: f64) -> f64 {
    match previous {
        Some(prev) if prev != 0.0 => (current - prev) / prev * 100.0,
        _ => 0.0,
    }
}

/// Most common protocol and its share of total traffic, first-seen order
/// breaking ties.
fn dominant_protocol(stats: &ProtocolStats) -> Option<(String, f64)> {
    if stats.total_packets == 0 {
        return None;
    }
    let mut best: Option<(&str, u64)> = None;
    for (proto, count) in stats.distribution() {
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((proto, count)),
        }
    }
    best.map(|(proto, count)| (proto.to_string(), count as f64 / stats.total_packets as f64))
}

pub fn generate_insights(stats: &ProtocolStats, anomalies: u64) -> Vec<String> {
    if stats.total_packets == 0 {
        return vec!["No packets observed yet.".to_string()];
    }

    let mut insights = Vec::new();

    insights.push(format!(
        "Observed {} packets averaging {:.2} bytes across {} protocol types.",
        stats.total_packets,
        stats.average_size,
        stats.protocols_seen()
    ));

    if let Some((proto, share)) = dominant_protocol(stats) {
        if share >= 0.5 {
            insights.push(format!(
                "{} accounts for {:.0}% of observed traffic.",
                proto,
                share * 100.0
            ));
        }
    }

    let unknown = stats.count_for(UNKNOWN_PROTOCOL);
    if unknown > 0 {
        insights.push(format!(
            "{unknown} packets carry an unrecognized protocol header."
        ));
    }

    if anomalies > 0 {
        insights.push(format!(
            "{anomalies} packets deviated from the rolling metric baseline."
        ));
    }

    insights
}

pub fn generate_recommendations(stats: &ProtocolStats, anomalies: u64) -> Vec<String> {
    if stats.total_packets == 0 {
        return vec!["Connect a packet source to begin analysis.".to_string()];
    }

    let mut recommendations = Vec::new();

    if stats.count_for(UNKNOWN_PROTOCOL) > 0 {
        recommendations
            .push("Inspect unrecognized frames before trusting the aggregate statistics.".to_string());
    }

    if anomalies > 0 {
        recommendations
            .push("Review flagged packets against the MCP framing reference.".to_string());
    }

    if let Some((proto, share)) = dominant_protocol(stats) {
        if share >= 0.8 && stats.protocols_seen() > 1 {
            recommendations.push(format!(
                "Traffic is dominated by {proto}; widen the capture window for a representative sample."
            ));
        }
    }

    if recommendations.is_empty() {
        recommendations
            .push("Traffic profile looks nominal; keep the current anomaly threshold.".to_string());
    }

    recommendations
}

/// Assemble the full dashboard payload from the current aggregate state.
pub fn dashboard_data(
    history: &MetricHistory,
    stats: &ProtocolStats,
    anomalies: u64,
) -> DashboardData {
    DashboardData {
        analysis: history.metrics(),
        insights: generate_insights(stats, anomalies),
        recommendations: generate_recommendations(stats, anomalies),
    }
}
