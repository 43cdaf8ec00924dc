//! 스냅샷 HTML 페이지.
//!
//! `GET /?market=KOSDAQ&sort=turnover_desc&growth=true`
//!
//! 잘못된 쿼리는 400 JSON, 데이터를 가져오지 못하면 503 안내 페이지를 반환합니다.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics::record_snapshot_view;
use crate::state::AppState;
use crate::view::{SnapshotView, ViewQuery, ViewRequest};

/// 스냅샷 페이지.
///
/// GET /
pub async fn snapshot_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Response> {
    let request = ViewRequest::resolve(&query, &state.view)?;

    let set = match state.store.snapshot().await {
        Ok(set) => set,
        Err(e) => {
            warn!(market = %request.market, error = %e, "스냅샷 페이지: 데이터 조회 실패");
            let html = state
                .renderer
                .render_unavailable(request.market, &e.to_string())
                .map_err(|e| ApiError::Render(e.to_string()))?;
            return Ok((StatusCode::SERVICE_UNAVAILABLE, Html(html)).into_response());
        }
    };

    let view = SnapshotView::build(&set, &request, &state.view);
    let html = state
        .renderer
        .render_snapshot(&view)
        .map_err(|e| ApiError::Render(e.to_string()))?;

    debug!(market = %request.market, sort = %request.sort, growth = request.growth, "스냅샷 페이지 렌더링");
    record_snapshot_view(request.market.as_str(), "html");

    Ok(Html(html).into_response())
}

/// 페이지 라우터 생성.
pub fn view_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(snapshot_page))
}
