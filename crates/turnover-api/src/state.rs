//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 `Arc`로 래핑되어 Axum의 State extractor로 주입됩니다.

use std::sync::Arc;
use turnover_core::ViewConfig;
use turnover_data::SnapshotStore;

use crate::view::HtmlRenderer;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 스냅샷 캐시 (조회 시 만료되었으면 갱신)
    pub store: Arc<dyn SnapshotStore>,

    /// 화면 기본값 (시장, 정렬, 행 수, 증가 배율)
    pub view: ViewConfig,

    /// HTML 페이지 렌더러
    pub renderer: Arc<HtmlRenderer>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    ///
    /// # 인자
    /// * `store` - 스냅샷 캐시
    /// * `view` - 화면 기본값
    /// * `renderer` - 템플릿이 등록된 렌더러
    pub fn new(store: Arc<dyn SnapshotStore>, view: ViewConfig, renderer: HtmlRenderer) -> Self {
        Self {
            store,
            view,
            renderer: Arc::new(renderer),
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 서버 업타임(초) 반환.
    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
    }
}

/// 테스트용 AppState 생성 헬퍼.
///
/// KRX 호출 없이 `FixtureProvider` 위에 실제 `SnapshotCache`를 구성합니다.
/// 대상 시장은 KOSPI 하나입니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state(
    provider: Arc<turnover_data::FixtureProvider>,
    zero_filter: turnover_core::ZeroFilter,
) -> AppState {
    use turnover_data::{CacheSettings, FundamentalsFetcher, SnapshotCache};

    let fetcher = FundamentalsFetcher::new(provider).with_zero_filter(zero_filter);
    let settings = CacheSettings {
        segments: vec![turnover_core::MarketSegment::Kospi],
        ..Default::default()
    };
    let cache = SnapshotCache::new(fetcher, settings);
    let renderer = HtmlRenderer::new().expect("Failed to register templates for test");

    AppState::new(Arc::new(cache), ViewConfig::default(), renderer)
}
