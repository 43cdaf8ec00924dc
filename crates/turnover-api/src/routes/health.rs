//! 헬스 체크 endpoint.
//!
//! 로드밸런서나 오케스트레이션 시스템(Kubernetes 등)에서 사용됩니다.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// 헬스 체크 응답 구조체.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 전체 서비스 상태 ("healthy" | "degraded" | "unhealthy")
    pub status: String,

    /// API 버전
    pub version: String,

    /// 서버 업타임(초)
    pub uptime_secs: i64,

    /// 현재 시간 (ISO 8601)
    pub timestamp: String,

    /// 스냅샷 캐시 상태
    pub cache: CacheHealth,
}

/// 스냅샷 캐시 상태.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheHealth {
    /// 한 번이라도 적재되었는지
    pub populated: bool,

    /// TTL 경과 여부
    pub stale: bool,

    /// 갱신 진행 중 여부
    pub refreshing: bool,

    /// 마지막 갱신 시각 (ISO 8601)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<String>,

    /// 보관 중인 거래일 (최신순, YYYY-MM-DD)
    pub days: Vec<String>,

    pub hits: u64,
    pub refreshes: u64,
    pub failures: u64,
}

/// 간단한 헬스 체크 (liveness probe용).
///
/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// 상세 헬스 체크 (readiness probe용).
///
/// 캐시가 비어 있으면 503, 만료된 데이터를 제공 중이면 degraded.
/// GET /health/ready
pub async fn health_ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.store.status().await;

    let (overall_status, status_code) = match (status.populated, status.stale) {
        (false, _) => ("unhealthy", StatusCode::SERVICE_UNAVAILABLE),
        (true, true) => ("degraded", StatusCode::OK),
        (true, false) => ("healthy", StatusCode::OK),
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        version: state.version.clone(),
        uptime_secs: state.uptime_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        cache: CacheHealth {
            populated: status.populated,
            stale: status.stale,
            refreshing: status.refreshing,
            refreshed_at: status.refreshed_at.map(|at| at.to_rfc3339()),
            days: status
                .days
                .iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect(),
            hits: status.hits,
            refreshes: status.refreshes,
            failures: status.failures,
        },
    };

    (status_code, Json(response))
}

/// 헬스 체크 라우터 생성.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(health_ready))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tower::ServiceExt;
    use turnover_core::{MarketSegment, ZeroFilter};
    use turnover_data::FixtureProvider;

    use crate::state::create_test_state;

    async fn ready(state: Arc<AppState>) -> (StatusCode, HealthResponse) {
        let app = Router::new()
            .route("/health/ready", get(health_ready))
            .with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/ready")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        let app = Router::new().route("/health", get(health_check));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_ready_before_first_load() {
        let state = Arc::new(create_test_state(
            Arc::new(FixtureProvider::new()),
            ZeroFilter::Off,
        ));

        let (status, health) = ready(state).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(health.status, "unhealthy");
        assert!(!health.cache.populated);
        assert!(health.cache.days.is_empty());
    }

    #[tokio::test]
    async fn test_health_ready_after_load() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let provider = Arc::new(FixtureProvider::new());
        provider.add_instrument(day, MarketSegment::Kospi, "005930", "삼성전자", 100, 1000, dec!(10), dec!(1));

        let state = Arc::new(create_test_state(provider, ZeroFilter::Off));
        state.store.snapshot().await.unwrap();

        let (status, health) = ready(state).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(health.status, "healthy");
        assert_eq!(health.cache.days, vec!["2024-01-05".to_string()]);
        assert_eq!(health.cache.refreshes, 1);
        assert!(!health.cache.refreshing);
        assert!(!health.version.is_empty());
    }
}
