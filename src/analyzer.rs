use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

/// Fixed MCP frame header length in bytes.
pub const HEADER_SIZE: usize = 4;

/// Known header prefixes, checked in order.
const PROTOCOL_PATTERNS: [(&[u8], &str); 3] = [
    (&[0x01, 0x00], "MCP-1"),
    (&[0x02, 0x00], "MCP-2"),
    (&[0x03, 0x00], "MCP-3"),
];

pub const UNKNOWN_PROTOCOL: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacketMetrics {
    /// Shannon entropy over byte values, 0..=8 bits.
    pub entropy: f64,
    /// Most frequent byte's share of the packet, 0..=1.
    pub byte_frequency: f64,
    /// Standard deviation of consecutive (wrapping) byte deltas.
    pub pattern_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacketStructure {
    pub header_size: usize,
    pub payload_size: usize,
    pub checksum_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacketAnalysis {
    pub timestamp: DateTime<Utc>,
    pub size: usize,
    pub protocol_type: String,
    pub structure: PacketStructure,
    pub metrics: PacketMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub packet_index: usize,
    pub timestamp: DateTime<Utc>,
    pub protocol_type: String,
    pub metrics: PacketMetrics,
    pub structure_issues: Vec<String>,
}

/// Machine Control Protocol frame analyzer.
///
/// Keeps a bounded history of per-packet analyses and flags packets whose
/// metrics sit too many standard deviations from the recent baseline.
pub struct McpAnalyzer {
    anomaly_threshold: f64,
    history_limit: usize,
    baseline_window: usize,
    history: VecDeque<PacketAnalysis>,
}

impl Default for McpAnalyzer {
    fn default() -> Self {
        McpAnalyzer::new(0.95)
    }
}

impl McpAnalyzer {
    pub fn new(anomaly_threshold: f64) -> Self {
        McpAnalyzer {
            anomaly_threshold,
            history_limit: 1000,
            baseline_window: 100,
            history: VecDeque::new(),
        }
    }

    pub fn with_limits(anomaly_threshold: f64, history_limit: usize, baseline_window: usize) -> Self {
        McpAnalyzer {
            anomaly_threshold,
            history_limit,
            baseline_window,
            history: VecDeque::new(),
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Analyze a single frame and record it in the rolling history.
    pub fn analyze_packet(&mut self, data: &[u8]) -> PacketAnalysis {
        let analysis = PacketAnalysis {
            timestamp: Utc::now(),
            size: data.len(),
            protocol_type: identify_protocol(data).to_string(),
            structure: analyze_structure(data),
            metrics: calculate_metrics(data),
        };

        self.history.push_back(analysis.clone());
        if self.history.len() > self.history_limit {
            self.history.pop_front();
        }

        analysis
    }

    /// Analyze a sequence of frames, flagging those that deviate from the
    /// rolling baseline. Every frame passes through `analyze_packet`, so the
    /// sequence also extends the history.
    pub fn detect_anomalies(&mut self, packets: &[Vec<u8>]) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        for (index, packet) in packets.iter().enumerate() {
            let analysis = self.analyze_packet(packet);

            if self.is_anomalous(&analysis) {
                debug!(
                    packet_index = index,
                    protocol = %analysis.protocol_type,
                    "packet metrics deviate from baseline"
                );
                anomalies.push(Anomaly {
                    packet_index: index,
                    timestamp: analysis.timestamp,
                    protocol_type: analysis.protocol_type.clone(),
                    metrics: analysis.metrics.clone(),
                    structure_issues: structure_issues(&analysis),
                });
            }
        }

        anomalies
    }

    /// A packet is anomalous when any of its metrics sits more than
    /// `anomaly_threshold` standard deviations from the mean of the most
    /// recent baseline window.
    fn is_anomalous(&self, analysis: &PacketAnalysis) -> bool {
        if self.history.is_empty() {
            return false;
        }

        let start = self.history.len().saturating_sub(self.baseline_window);
        let baseline: Vec<&PacketMetrics> =
            self.history.iter().skip(start).map(|a| &a.metrics).collect();

        let exceeds = |values: &[f64], current: f64| {
            let mean = mean(values);
            // std of 0 would make every packet its own anomaly
            let std = match std_dev(values) {
                s if s == 0.0 => 1.0,
                s => s,
            };
            ((current - mean) / std).abs() > self.anomaly_threshold
        };

        let entropies: Vec<f64> = baseline.iter().map(|m| m.entropy).collect();
        let frequencies: Vec<f64> = baseline.iter().map(|m| m.byte_frequency).collect();
        let patterns: Vec<f64> = baseline.iter().map(|m| m.pattern_score).collect();

        exceeds(&entropies, analysis.metrics.entropy)
            || exceeds(&frequencies, analysis.metrics.byte_frequency)
            || exceeds(&patterns, analysis.metrics.pattern_score)
    }
}

/// Identify the protocol from the frame's header prefix.
pub fn identify_protocol(data: &[u8]) -> &'static str {
    let header = &data[..data.len().min(HEADER_SIZE)];
    for (pattern, protocol) in PROTOCOL_PATTERNS {
        if header.starts_with(pattern) {
            return protocol;
        }
    }
    UNKNOWN_PROTOCOL
}

pub fn analyze_structure(data: &[u8]) -> PacketStructure {
    PacketStructure {
        header_size: HEADER_SIZE,
        payload_size: data.len().saturating_sub(HEADER_SIZE),
        checksum_valid: verify_checksum(data),
    }
}

/// Checksum convention: the last byte equals the byte sum of everything but
/// the trailing four bytes, modulo 256.
pub fn verify_checksum(data: &[u8]) -> bool {
    if data.len() < 4 {
        return false;
    }
    let sum: u64 = data[..data.len() - 4].iter().map(|&b| u64::from(b)).sum();
    sum % 256 == u64::from(data[data.len() - 1])
}

pub fn calculate_metrics(data: &[u8]) -> PacketMetrics {
    PacketMetrics {
        entropy: calculate_entropy(data),
        byte_frequency: calculate_byte_frequency(data),
        pattern_score: calculate_pattern_score(data),
    }
}

fn calculate_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; 256];
    for &byte in data {
        counts[byte as usize] += 1;
    }

    let len = data.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let freq = c as f64 / len;
            -freq * freq.log2()
        })
        .sum()
}

fn calculate_byte_frequency(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut counts = [0u64; 256];
    for &byte in data {
        counts[byte as usize] += 1;
    }
    let max = counts.iter().copied().max().unwrap_or(0);
    max as f64 / data.len() as f64
}

fn calculate_pattern_score(data: &[u8]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }

    // wrapping deltas, matching unsigned byte arithmetic
    let diffs: Vec<f64> = data
        .windows(2)
        .map(|pair| f64::from(pair[1].wrapping_sub(pair[0])))
        .collect();
    std_dev(&diffs)
}

pub fn structure_issues(analysis: &PacketAnalysis) -> Vec<String> {
    let mut issues = Vec::new();
    if !analysis.structure.checksum_valid {
        issues.push("Invalid checksum".to_string());
    }
    if analysis.structure.payload_size == 0 {
        issues.push("Empty payload".to_string());
    }
    if analysis.protocol_type == UNKNOWN_PROTOCOL {
        issues.push("Unrecognized protocol".to_string());
    }
    issues
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_known_protocols() {
        assert_eq!(identify_protocol(b"\x01\x00\x00\x00payload"), "MCP-1");
        assert_eq!(identify_protocol(b"\x02\x00\x00\x00payload"), "MCP-2");
        assert_eq!(identify_protocol(b"\x03\x00\x00\x00payload"), "MCP-3");
        assert_eq!(identify_protocol(b"\xFF\xFF\x00\x00payload"), UNKNOWN_PROTOCOL);
    }

    #[test]
    fn structure_reports_header_and_payload_sizes() {
        let packet = b"\x01\x00\x00\x00payload\x00";
        let structure = analyze_structure(packet);
        assert_eq!(structure.header_size, HEADER_SIZE);
        assert_eq!(structure.payload_size, packet.len() - HEADER_SIZE);
    }

    #[test]
    fn checksum_verification() {
        // 1+2+3+4 = 10, trailing byte 10
        let valid = [1u8, 2, 3, 4, 10];
        assert!(verify_checksum(&valid));

        let invalid = [1u8, 2, 3, 4, 0];
        assert!(!verify_checksum(&invalid));

        // too short to carry a checksum
        assert!(!verify_checksum(&[1u8, 2, 3]));
    }

    #[test]
    fn entropy_bounds() {
        // uniform distribution: maximum entropy for bytes
        let uniform: Vec<u8> = (0..=255).collect();
        let entropy = calculate_entropy(&uniform);
        assert!((entropy - 8.0).abs() < 0.1);

        // single value: minimum entropy
        let flat = vec![0u8; 256];
        let entropy = calculate_entropy(&flat);
        assert!(entropy.abs() < 0.1);
    }

    #[test]
    fn byte_frequency_is_normalized() {
        let data = b"\x01\x00\x00\x00test_data\x00";
        let metrics = calculate_metrics(data);
        assert!(metrics.byte_frequency > 0.0 && metrics.byte_frequency <= 1.0);
        assert!(metrics.entropy >= 0.0 && metrics.entropy <= 8.0);
    }

    #[test]
    fn history_stays_bounded() {
        let mut analyzer = McpAnalyzer::with_limits(0.95, 8, 4);
        for _ in 0..20 {
            analyzer.analyze_packet(b"\x01\x00\x00\x00payload");
        }
        assert_eq!(analyzer.history_len(), 8);
    }

    #[test]
    fn detects_outlier_against_uniform_baseline() {
        let mut analyzer = McpAnalyzer::default();

        for _ in 0..10 {
            analyzer.analyze_packet(b"\x01\x00\x00\x00normal\x00");
        }

        let mut anomalous = b"\x01\x00\x00\x00".to_vec();
        anomalous.extend(std::iter::repeat(255u8).take(100));

        let anomalies = analyzer.detect_anomalies(&[anomalous]);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].packet_index, 0);
    }

    #[test]
    fn uniform_traffic_raises_no_anomalies() {
        let mut analyzer = McpAnalyzer::default();
        for _ in 0..10 {
            analyzer.analyze_packet(b"\x02\x00\x00\x00steady\x00");
        }

        let packets = vec![b"\x02\x00\x00\x00steady\x00".to_vec(); 3];
        let anomalies = analyzer.detect_anomalies(&packets);
        assert!(anomalies.is_empty());
    }

    #[test]
    fn anomaly_reports_structure_issues() {
        let mut analyzer = McpAnalyzer::default();
        for _ in 0..10 {
            analyzer.analyze_packet(b"\x01\x00\x00\x00normal\x00");
        }

        // unknown header and a payload of identical bytes
        let mut odd = b"\xEE\xEE\x00\x00".to_vec();
        odd.extend(std::iter::repeat(7u8).take(80));

        let anomalies = analyzer.detect_anomalies(&[odd]);
        assert_eq!(anomalies.len(), 1);
        assert!(anomalies[0]
            .structure_issues
            .contains(&"Unrecognized protocol".to_string()));
    }
}
