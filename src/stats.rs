use std::collections::HashMap;

use serde::Serialize;

use crate::models::domain::PacketRecord;

/// Aggregate statistics over a sequence of packet records.
///
/// Derived, never persisted: recomputed whenever the underlying record
/// sequence changes. `average_size` is the unrounded arithmetic mean;
/// rounding to two decimals happens only at render time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProtocolStats {
    pub total_packets: u64,
    pub total_bytes: u64,
    pub average_size: f64,
    pub protocol_distribution: HashMap<String, u64>,
    #[serde(skip)]
    first_seen: Vec<String>,
}

impl ProtocolStats {
    pub fn new() -> Self {
        ProtocolStats::default()
    }

    /// Single-pass reduction over the record sequence.
    ///
    /// Empty input yields the zero value `{0, 0.0, {}}` rather than dividing
    /// by zero; this is the only guarded edge case.
    pub fn from_records(records: &[PacketRecord]) -> Self {
        let mut stats = ProtocolStats::new();
        if records.is_empty() {
            return stats;
        }
        for record in records {
            stats.update(record);
        }
        stats
    }

    pub fn update(&mut self, record: &PacketRecord) {
        self.total_packets += 1;
        self.total_bytes += record.packet_size;
        self.average_size = self.total_bytes as f64 / self.total_packets as f64;
        if !self.protocol_distribution.contains_key(&record.protocol_type) {
            self.first_seen.push(record.protocol_type.clone());
        }
        *self
            .protocol_distribution
            .entry(record.protocol_type.clone())
            .or_insert(0) += 1;
    }

    /// Distribution entries in first-seen order. The order carries no meaning
    /// beyond keeping the rendered panel stable between redraws.
    pub fn distribution(&self) -> impl Iterator<Item = (&str, u64)> {
        self.first_seen
            .iter()
            .map(|proto| (proto.as_str(), self.protocol_distribution[proto]))
    }

    pub fn protocols_seen(&self) -> usize {
        self.protocol_distribution.len()
    }

    pub fn count_for(&self, protocol: &str) -> u64 {
        self.protocol_distribution.get(protocol).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(protocol: &str, size: u64) -> PacketRecord {
        PacketRecord::new(protocol, size)
    }

    #[test]
    fn empty_input_yields_zero_stats() {
        let stats = ProtocolStats::from_records(&[]);
        assert_eq!(stats.total_packets, 0);
        assert_eq!(stats.average_size, 0.0);
        assert!(stats.protocol_distribution.is_empty());
    }

    #[test]
    fn sample_input_aggregates_exactly() {
        let records = vec![record("MCP-1", 100), record("MCP-2", 150)];
        let stats = ProtocolStats::from_records(&records);

        assert_eq!(stats.total_packets, 2);
        assert_eq!(stats.average_size, 125.0);
        assert_eq!(stats.count_for("MCP-1"), 1);
        assert_eq!(stats.count_for("MCP-2"), 1);
    }

    #[test]
    fn repeated_protocols_are_counted() {
        let records = vec![
            record("A", 10),
            record("A", 20),
            record("A", 30),
            record("B", 40),
        ];
        let stats = ProtocolStats::from_records(&records);

        assert_eq!(stats.count_for("A"), 3);
        assert_eq!(stats.count_for("B"), 1);
        let counted: u64 = stats.protocol_distribution.values().sum();
        assert_eq!(counted, stats.total_packets);
    }

    #[test]
    fn recomputation_is_idempotent() {
        let records = vec![record("MCP-1", 100), record("MCP-3", 33), record("MCP-1", 7)];
        let first = ProtocolStats::from_records(&records);
        let second = ProtocolStats::from_records(&records);
        assert_eq!(first, second);
    }

    #[test]
    fn average_is_unrounded_until_render() {
        let records = vec![record("A", 1), record("A", 2)];
        let stats = ProtocolStats::from_records(&records);
        assert_eq!(stats.average_size, 1.5);

        let records = vec![record("A", 1), record("A", 1), record("A", 2)];
        let stats = ProtocolStats::from_records(&records);
        assert!((stats.average_size - 4.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn distribution_iterates_in_first_seen_order() {
        let records = vec![
            record("MCP-2", 1),
            record("MCP-1", 1),
            record("MCP-2", 1),
            record("MCP-3", 1),
        ];
        let stats = ProtocolStats::from_records(&records);
        let order: Vec<&str> = stats.distribution().map(|(proto, _)| proto).collect();
        assert_eq!(order, vec!["MCP-2", "MCP-1", "MCP-3"]);
    }

    #[test]
    fn incremental_update_matches_batch() {
        let records = vec![record("A", 5), record("B", 15), record("A", 25)];
        let mut incremental = ProtocolStats::new();
        for r in &records {
            incremental.update(r);
        }
        assert_eq!(incremental, ProtocolStats::from_records(&records));
    }
}
