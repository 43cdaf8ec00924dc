//! 통합 API 에러 응답 타입.
//!
//! 모든 JSON 엔드포인트에서 같은 형식의 에러 본문을 반환합니다.
//!
//! ```json
//! {
//!   "code": "DATA_UNAVAILABLE",
//!   "message": "Upstream unavailable: ...",
//!   "timestamp": 1738300800
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use turnover_core::CoreError;
use turnover_data::DataError;

/// API 에러 응답 본문.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "INVALID_QUERY", "DATA_UNAVAILABLE")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 에러 발생 시각 (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ApiErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            timestamp: Some(chrono::Utc::now().timestamp()),
        }
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// 핸들러 에러.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 잘못된 쿼리 파라미터
    #[error(transparent)]
    Query(#[from] CoreError),

    /// 스냅샷을 가져올 수 없음
    #[error(transparent)]
    Data(#[from] DataError),

    /// HTML 렌더링 실패
    #[error("렌더링 실패: {0}")]
    Render(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Query(e) if e.is_user_input() => StatusCode::BAD_REQUEST,
            ApiError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Data(DataError::ConfigError(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Data(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Query(e) if e.is_user_input() => "INVALID_QUERY",
            ApiError::Query(_) => "CONFIG_ERROR",
            ApiError::Data(DataError::ConfigError(_)) => "CONFIG_ERROR",
            ApiError::Data(_) => "DATA_UNAVAILABLE",
            ApiError::Render(_) => "RENDER_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "API 요청 실패");
        }
        (status, Json(ApiErrorResponse::new(self.code(), self.to_string()))).into_response()
    }
}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let bad = ApiError::from(CoreError::UnknownMarket("NYSE".to_string()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bad.code(), "INVALID_QUERY");

        let down = ApiError::from(DataError::UpstreamUnavailable("timeout".to_string()));
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);

        let incomplete = ApiError::from(DataError::IncompleteData("LIST_SHRS".to_string()));
        assert_eq!(incomplete.code(), "DATA_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_error_body_is_json() {
        let response = ApiError::from(CoreError::UnknownSort("name_asc".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ApiErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.code, "INVALID_QUERY");
        assert!(parsed.message.contains("name_asc"));
        assert!(parsed.timestamp.is_some());
    }
}
