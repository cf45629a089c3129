pub mod domain {
    use chrono::{DateTime, Utc};

    /// One observed protocol packet, already structured by whatever produced it.
    #[derive(Debug, Clone, PartialEq)]
    pub struct PacketRecord {
        pub protocol_type: String,
        pub packet_size: u64,
        pub timestamp: DateTime<Utc>,
    }

    impl PacketRecord {
        pub fn new(protocol_type: impl Into<String>, packet_size: u64) -> Self {
            PacketRecord {
                protocol_type: protocol_type.into(),
                packet_size,
                timestamp: Utc::now(),
            }
        }
    }

    /// A titled dashboard value with its trend percentage and trend-line series.
    /// `data` is ordered; sequence order is the chronological order of the
    /// rendered trend line.
    #[derive(Debug, Clone, PartialEq)]
    pub struct AnalysisMetric {
        pub title: String,
        pub value: f64,
        pub change: f64,
        pub data: Vec<(String, f64)>,
    }

    /// Everything the dashboard renders: metric cards, insights and
    /// recommendations, each in input order.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct DashboardData {
        pub analysis: Vec<AnalysisMetric>,
        pub insights: Vec<String>,
        pub recommendations: Vec<String>,
    }
}

pub mod dto {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    use super::domain::{AnalysisMetric, PacketRecord};

    /// Wire shape of a packet record as submitted to `POST /analyze`.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProtocolData {
        pub protocol_type: String,
        pub timestamp: DateTime<Utc>,
        pub packet_size: u64,
        #[serde(default)]
        pub payload: serde_json::Value,
    }

    impl From<ProtocolData> for PacketRecord {
        fn from(data: ProtocolData) -> Self {
            PacketRecord {
                protocol_type: data.protocol_type,
                packet_size: data.packet_size,
                timestamp: data.timestamp,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AnalysisMetricDto {
        pub title: String,
        pub value: f64,
        pub change: f64,
        pub data: Vec<TrendPoint>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct TrendPoint {
        pub x: String,
        pub y: f64,
    }

    impl From<AnalysisMetric> for AnalysisMetricDto {
        fn from(metric: AnalysisMetric) -> Self {
            AnalysisMetricDto {
                title: metric.title,
                value: metric.value,
                change: metric.change,
                data: metric
                    .data
                    .into_iter()
                    .map(|(x, y)| TrendPoint { x, y })
                    .collect(),
            }
        }
    }

    /// Response body of `POST /analyze`.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AnalysisResult {
        pub analysis: Vec<AnalysisMetricDto>,
        pub insights: Vec<String>,
        pub recommendations: Vec<String>,
    }
}
