//! 스냅샷 JSON API.
//!
//! # 엔드포인트
//!
//! - `GET /api/v1/snapshot?market=KOSPI&sort=turnover_desc&growth=true` - 거래일별 표
//! - `GET /api/v1/snapshot/days` - 캐시된 거래일 목록

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiResult;
use crate::metrics::record_snapshot_view;
use crate::state::AppState;
use crate::view::{SnapshotView, ViewQuery, ViewRequest};

/// 거래일 목록 응답.
#[derive(Debug, Serialize)]
pub struct TradingDaysResponse {
    /// 최신순
    pub days: Vec<NaiveDate>,
    pub refreshed_at: chrono::DateTime<chrono::Utc>,
}

/// 거래일별 스냅샷 표.
///
/// GET /api/v1/snapshot
pub async fn get_snapshot(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Json<SnapshotView>> {
    let request = ViewRequest::resolve(&query, &state.view)?;
    let set = state.store.snapshot().await?;

    let view = SnapshotView::build(&set, &request, &state.view);
    debug!(market = %request.market, sort = %request.sort, days = view.days.len(), "스냅샷 JSON 응답");
    record_snapshot_view(request.market.as_str(), "json");

    Ok(Json(view))
}

/// 캐시된 거래일 목록.
///
/// GET /api/v1/snapshot/days
pub async fn get_trading_days(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<TradingDaysResponse>> {
    let set = state.store.snapshot().await?;

    Ok(Json(TradingDaysResponse {
        days: set.days().to_vec(),
        refreshed_at: set.refreshed_at(),
    }))
}

/// 스냅샷 라우터 생성.
pub fn snapshot_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_snapshot))
        .route("/days", get(get_trading_days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use rust_decimal_macros::dec;
    use tower::ServiceExt;
    use turnover_core::{MarketSegment, ZeroFilter};
    use turnover_data::FixtureProvider;

    use crate::state::create_test_state;

    fn app(provider: Arc<FixtureProvider>) -> Router {
        snapshot_router().with_state(Arc::new(create_test_state(provider, ZeroFilter::Off)))
    }

    fn provider() -> Arc<FixtureProvider> {
        let provider = Arc::new(FixtureProvider::new());
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        provider.add_instrument(day, MarketSegment::Kospi, "000660", "SK하이닉스", 300, 1000, dec!(8), dec!(1.2));
        provider.add_instrument(day, MarketSegment::Kospi, "005930", "삼성전자", 500, 10000, dec!(12), dec!(1.1));
        provider
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_snapshot_sorted_by_turnover() {
        let (status, body) = get_json(app(provider()), "/?sort=turnover_desc").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["market"], "KOSPI");
        assert_eq!(body["sort"], "turnover_desc");

        let rows = body["days"][0]["rows"].as_array().unwrap();
        // 회전율: SK하이닉스 30%, 삼성전자 5%
        assert_eq!(rows[0]["instrument_id"], "000660");
        let ratio: rust_decimal::Decimal = rows[0]["turnover_ratio"].as_str().unwrap().parse().unwrap();
        assert_eq!(ratio, dec!(30));
        assert_eq!(rows[1]["instrument_id"], "005930");
        assert_eq!(body["days"][0]["date"], "2024-01-05");
    }

    #[tokio::test]
    async fn test_snapshot_default_sort_is_volume() {
        let (_, body) = get_json(app(provider()), "/").await;

        assert_eq!(body["sort"], "volume_desc");
        assert_eq!(body["days"][0]["rows"][0]["instrument_id"], "005930");
    }

    #[tokio::test]
    async fn test_unknown_sort_is_bad_request() {
        let (status, body) = get_json(app(provider()), "/?sort=name_up").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_QUERY");
    }

    #[tokio::test]
    async fn test_empty_provider_is_unavailable() {
        let (status, body) = get_json(app(Arc::new(FixtureProvider::new())), "/").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "DATA_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_trading_days() {
        let (status, body) = get_json(app(provider()), "/days").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["days"], serde_json::json!(["2024-01-05"]));
    }
}
