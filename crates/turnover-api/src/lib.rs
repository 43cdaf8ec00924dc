//! 일별 회전율 스냅샷 웹 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 거래일별 회전율 HTML 페이지
//! - 같은 데이터를 반환하는 JSON API
//! - 캐시 상태를 포함한 헬스 체크 엔드포인트
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: HTTP 엔드포인트
//! - [`view`]: 스냅샷 → 표 변환 및 HTML 렌더링
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어

pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod view;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use routes::{create_router, CacheHealth, HealthResponse, TradingDaysResponse};
pub use state::AppState;
pub use view::{HtmlRenderer, SnapshotView, ViewQuery, ViewRequest};

#[cfg(any(test, feature = "test-utils"))]
pub use state::create_test_state;
