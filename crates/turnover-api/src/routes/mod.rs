//! HTTP 라우트.
//!
//! # 라우트 구조
//!
//! - `/` - 거래일별 회전율 HTML 페이지
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 캐시 상태 포함 헬스 체크 (readiness)
//! - `/api/v1/snapshot` - 거래일별 표 (JSON)
//! - `/api/v1/snapshot/days` - 캐시된 거래일 목록

pub mod health;
pub mod snapshot;
pub mod view;

pub use health::{health_router, CacheHealth, HealthResponse};
pub use snapshot::{snapshot_router, TradingDaysResponse};
pub use view::view_router;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 라우터 생성.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(view_router())
        .nest("/health", health_router())
        .nest("/api/v1/snapshot", snapshot_router())
}
