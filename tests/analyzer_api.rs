use analyzemcp::analyzer::{McpAnalyzer, HEADER_SIZE, UNKNOWN_PROTOCOL};
use analyzemcp::feed;
use analyzemcp::insights::MetricHistory;
use analyzemcp::models::domain::PacketRecord;
use analyzemcp::server;
use analyzemcp::stats::ProtocolStats;

#[test]
fn protocol_identification() {
    let mut analyzer = McpAnalyzer::default();

    let analysis = analyzer.analyze_packet(b"\x01\x00\x00\x00payload");
    assert_eq!(analysis.protocol_type, "MCP-1");

    let analysis = analyzer.analyze_packet(b"\xFF\xFF\x00\x00payload");
    assert_eq!(analysis.protocol_type, UNKNOWN_PROTOCOL);
}

#[test]
fn packet_structure_analysis() {
    let mut analyzer = McpAnalyzer::default();
    let packet = b"\x01\x00\x00\x00payload\x00";

    let analysis = analyzer.analyze_packet(packet);
    assert_eq!(analysis.structure.header_size, HEADER_SIZE);
    assert_eq!(analysis.structure.payload_size, packet.len() - HEADER_SIZE);
    assert_eq!(analysis.size, packet.len());
}

#[test]
fn anomaly_detection_flags_outlier() {
    let mut analyzer = McpAnalyzer::default();

    for _ in 0..10 {
        analyzer.analyze_packet(b"\x01\x00\x00\x00normal\x00");
    }

    let mut anomalous = b"\x01\x00\x00\x00".to_vec();
    anomalous.extend(std::iter::repeat(255u8).take(100));

    let anomalies = analyzer.detect_anomalies(&[anomalous]);
    assert!(!anomalies.is_empty());
}

#[test]
fn metric_calculation_bounds() {
    let mut analyzer = McpAnalyzer::default();
    let analysis = analyzer.analyze_packet(b"\x01\x00\x00\x00test_data\x00");

    let metrics = &analysis.metrics;
    assert!(metrics.entropy >= 0.0 && metrics.entropy <= 8.0);
    assert!(metrics.byte_frequency >= 0.0 && metrics.byte_frequency <= 1.0);
    assert!(metrics.pattern_score >= 0.0);
}

#[test]
fn checksum_verification() {
    use analyzemcp::analyzer::verify_checksum;

    let valid = [1u8, 2, 3, 4, 10];
    assert!(verify_checksum(&valid));

    let invalid = [1u8, 2, 3, 4, 0];
    assert!(!verify_checksum(&invalid));
}

#[test]
fn sample_pipeline_end_to_end() {
    // the composition-root path: sample records -> stats -> dashboard payload
    let records = feed::sample_records();
    let stats = ProtocolStats::from_records(&records);
    assert_eq!(stats.total_packets, 2);
    assert_eq!(stats.average_size, 125.0);

    let mut history = MetricHistory::new(30);
    history.record(&stats, 0);

    let result = server::analysis_result(&history, &stats);
    assert_eq!(result.analysis.len(), 4);
    assert_eq!(result.analysis[0].title, "Total Packets");
    assert_eq!(result.analysis[0].value, 2.0);
    assert_eq!(result.analysis[1].value, 125.0);
    assert!(!result.insights.is_empty());
    assert!(!result.recommendations.is_empty());
}

#[test]
fn frames_and_records_stay_consistent() {
    let mut analyzer = McpAnalyzer::default();

    let records: Vec<PacketRecord> = feed::sample_frames()
        .iter()
        .map(|frame| {
            let analysis = analyzer.analyze_packet(frame);
            assert!(analysis.structure.checksum_valid);
            PacketRecord::new(analysis.protocol_type.clone(), analysis.size as u64)
        })
        .collect();

    let stats = ProtocolStats::from_records(&records);
    assert_eq!(stats.count_for("MCP-1"), 1);
    assert_eq!(stats.count_for("MCP-2"), 1);
    let counted: u64 = records.iter().map(|_| 1).sum();
    assert_eq!(counted, stats.total_packets);
}
