use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::insights::{self, MetricHistory};
use crate::models::domain::PacketRecord;
use crate::models::dto::{AnalysisResult, ProtocolData};
use crate::stats::ProtocolStats;

/// Shared API state: cumulative statistics over everything submitted so far,
/// plus the snapshot history backing the metric trend lines.
#[derive(Clone)]
pub struct ApiState {
    inner: Arc<Mutex<Shared>>,
}

struct Shared {
    cumulative: ProtocolStats,
    history: MetricHistory,
}

impl ApiState {
    pub fn new(trend_window: usize) -> Self {
        ApiState {
            inner: Arc::new(Mutex::new(Shared {
                cumulative: ProtocolStats::new(),
                history: MetricHistory::new(trend_window),
            })),
        }
    }
}

pub fn router(config: &AppConfig) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(ApiState::new(config.trend_window))
}

pub async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(&config);
    info!(addr = %config.bind_addr, "analysis API listening");

    axum::Server::bind(&config.bind_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

/// Analyze a submitted batch of protocol records.
///
/// Insights and recommendations describe the submitted batch; the batch also
/// rolls into the cumulative state served by `GET /metrics` and into the
/// trend snapshots behind the metric cards.
async fn analyze(
    State(state): State<ApiState>,
    Json(batch): Json<Vec<ProtocolData>>,
) -> Json<AnalysisResult> {
    let records: Vec<PacketRecord> = batch.into_iter().map(Into::into).collect();
    let batch_stats = ProtocolStats::from_records(&records);

    let mut shared = state.inner.lock().await;
    for record in &records {
        shared.cumulative.update(record);
    }
    let cumulative = shared.cumulative.clone();
    shared.history.record(&cumulative, 0);

    Json(analysis_result(&shared.history, &batch_stats))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn metrics(State(state): State<ApiState>) -> Json<ProtocolStats> {
    let shared = state.inner.lock().await;
    Json(shared.cumulative.clone())
}

/// Build the `/analyze` response body from the trend history and the stats of
/// the batch under analysis. Raw frames never reach this endpoint, so the
/// anomaly count is zero here.
pub fn analysis_result(history: &MetricHistory, stats: &ProtocolStats) -> AnalysisResult {
    let data = insights::dashboard_data(history, stats, 0);
    AnalysisResult {
        analysis: data.analysis.into_iter().map(Into::into).collect(),
        insights: data.insights,
        recommendations: data.recommendations,
    }
}
