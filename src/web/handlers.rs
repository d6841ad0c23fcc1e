//! HTTP request handlers.

use super::AppState;
use crate::health::{ConnectivityResult, Diagnosis, HealthReport, StabilityReport};
use crate::history::{HealthRecord, HISTORY_CAPACITY};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};

const DEFAULT_HISTORY_COUNT: usize = 30;

// ============================================================================
// API: Live checks
// ============================================================================

pub async fn handle_connectivity(State(state): State<AppState>) -> Json<ConnectivityResult> {
    Json(state.engine.check_connectivity().await)
}

#[derive(Debug, Serialize)]
pub struct HealthScoreResponse {
    pub score: u8,
}

pub async fn handle_health_score(State(state): State<AppState>) -> Json<HealthScoreResponse> {
    Json(HealthScoreResponse {
        score: state.engine.health_score().await,
    })
}

pub async fn handle_health_report(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.engine.health_report().await)
}

pub async fn handle_stability(State(state): State<AppState>) -> Json<StabilityReport> {
    Json(state.engine.analyze_stability())
}

pub async fn handle_diagnosis(State(state): State<AppState>) -> Json<Diagnosis> {
    Json(state.engine.run_full_diagnosis().await)
}

// ============================================================================
// API: History
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub count: Option<usize>,
}

pub async fn handle_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<HealthRecord>> {
    let count = query
        .count
        .unwrap_or(DEFAULT_HISTORY_COUNT)
        .min(HISTORY_CAPACITY);
    Json(state.engine.recent_records(count))
}

pub async fn handle_statistics(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.aggregate_statistics() {
        Some(stats) => Json(stats).into_response(),
        None => (StatusCode::NOT_FOUND, "No history recorded yet").into_response(),
    }
}

pub async fn handle_log_sample(State(state): State<AppState>) -> impl IntoResponse {
    let record = state.engine.log_sample().await;
    (StatusCode::CREATED, Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::health::HealthEngine;
    use crate::history::HistoryStore;
    use crate::probe::testing::ScriptedRunner;
    use crate::probe::SystemResolver;
    use std::sync::Arc;

    fn state() -> AppState {
        let runner = Arc::new(
            ScriptedRunner::new()
                .with("A", &[Some(30.0)])
                .with("B", &[Some(10.0)]),
        );
        let config = EngineConfig {
            primary_target: "A".to_string(),
            targets: vec!["A".to_string(), "B".to_string()],
            ..Default::default()
        };
        AppState {
            engine: Arc::new(HealthEngine::with_parts(
                config,
                runner,
                Arc::new(SystemResolver::default()),
                HistoryStore::in_memory(),
            )),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connectivity_reports_fastest() {
        let Json(result) = handle_connectivity(State(state())).await;
        assert!(result.connected);
        assert_eq!(result.fastest_target.as_deref(), Some("B"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_score_and_report() {
        let state = state();
        let Json(summary) = handle_health_score(State(state.clone())).await;
        let Json(report) = handle_health_report(State(state)).await;
        assert_eq!(summary.score, 96);
        assert_eq!(report.score, 96);
        assert_eq!(report.pings_total, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_statistics_missing_before_first_sample() {
        let state = state();
        let response = handle_statistics(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = handle_log_sample(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = handle_statistics(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats["total_tests"], 1);
        assert_eq!(stats["avg_latency"], 30.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_defaults_to_thirty_records() {
        let state = state();
        for _ in 0..35 {
            handle_log_sample(State(state.clone())).await;
            tokio::time::advance(std::time::Duration::from_secs(3)).await;
        }

        let Json(records) =
            handle_history(State(state.clone()), Query(HistoryQuery { count: None })).await;
        assert_eq!(records.len(), 30);

        let Json(records) =
            handle_history(State(state), Query(HistoryQuery { count: Some(5) })).await;
        assert_eq!(records.len(), 5);
    }
}
