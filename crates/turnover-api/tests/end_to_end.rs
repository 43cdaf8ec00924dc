//! 수집기 → 캐시 → 라우터 전체 경로 테스트.
//!
//! KRX 대신 `FixtureProvider`를 사용합니다.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tower::ServiceExt;

use turnover_api::{create_router, AppState, HtmlRenderer};
use turnover_core::{MarketSegment, ViewConfig, ZeroFilter};
use turnover_data::{
    CacheSettings, FixtureProvider, FundamentalsFetcher, ProviderCall, SnapshotCache,
};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
}

/// KOSPI 1거래일, 3종목. "LOSS"는 PER이 0.
fn provider() -> Arc<FixtureProvider> {
    let provider = Arc::new(FixtureProvider::new());
    provider.add_instrument(day(), MarketSegment::Kospi, "AAA", "에이", 1_000, 100_000, dec!(10), dec!(1));
    provider.add_instrument(day(), MarketSegment::Kospi, "BBB", "비", 500, 1_000, dec!(5), dec!(0.5));
    provider.add_instrument(day(), MarketSegment::Kospi, "LOSS", "적자", 9_000, 10_000, dec!(0), dec!(0.7));
    provider
}

fn app(provider: Arc<FixtureProvider>, zero_filter: ZeroFilter) -> Router {
    let fetcher = FundamentalsFetcher::new(provider).with_zero_filter(zero_filter);
    let settings = CacheSettings {
        segments: vec![MarketSegment::Kospi],
        ..Default::default()
    };
    let cache = Arc::new(SnapshotCache::new(fetcher, settings));
    let renderer = HtmlRenderer::new().unwrap();
    let state = Arc::new(AppState::new(cache, ViewConfig::default(), renderer));

    create_router().with_state(state)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

fn ids(body: &serde_json::Value) -> Vec<String> {
    body["days"][0]["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["instrument_id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn turnover_ranking_excludes_zero_per() {
    let app = app(provider(), ZeroFilter::Fundamentals);

    let (status, body) = get(&app, "/api/v1/snapshot?market=KOSPI&sort=turnover_desc").await;
    assert_eq!(status, StatusCode::OK);

    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    // BBB 50% > AAA 1%, LOSS(PER 0)는 제외
    assert_eq!(ids(&body), vec!["BBB", "AAA"]);
    assert_eq!(body["days"][0]["rows"][0]["name"], "비");
    assert_eq!(body["days"][0]["rows"][0]["rank"], 1);
}

#[tokio::test]
async fn zero_filter_off_keeps_all_rows() {
    let app = app(provider(), ZeroFilter::Off);

    let (_, body) = get(&app, "/api/v1/snapshot?sort=volume_desc").await;
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(ids(&body), vec!["LOSS", "AAA", "BBB"]);
}

#[tokio::test]
async fn repeated_requests_hit_cache() {
    let provider = provider();
    let app = app(Arc::clone(&provider), ZeroFilter::Off);

    for _ in 0..3 {
        let (status, _) = get(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = get(&app, "/api/v1/snapshot?market=KOSDAQ").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(provider.calls(ProviderCall::MarketCap), 1);
    assert_eq!(provider.calls(ProviderCall::Fundamentals), 1);
}

#[tokio::test]
async fn html_page_and_health_after_load() {
    let app = app(provider(), ZeroFilter::Off);

    let (status, _) = get(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = get(&app, "/?sort=turnover_desc").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("2024-01-05"));
    assert!(html.contains("적자"));
    assert!(html.contains("90.00"));

    let (status, body) = get(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["cache"]["days"], serde_json::json!(["2024-01-05"]));
}

#[tokio::test]
async fn upstream_failure_is_service_unavailable() {
    let provider = provider();
    provider.fail_on(day());
    let app = app(provider, ZeroFilter::Off);

    let (status, body) = get(&app, "/api/v1/snapshot").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["code"], "DATA_UNAVAILABLE");

    let (status, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(String::from_utf8(body).unwrap().contains("시장 데이터를 가져오지 못했습니다"));
}

#[tokio::test]
async fn liveness_is_always_ok() {
    let app = app(Arc::new(FixtureProvider::new()), ZeroFilter::Off);

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}
