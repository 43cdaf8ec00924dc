//! HTTP 요청 훅.
//!
//! Provider 클라이언트 생성 시 주입하여 모든 upstream 요청을 관찰합니다.
//! 기본 구현 `TracingHook`은 요청/응답을 debug 로그로 남깁니다.

use std::time::Duration;

/// 요청 정보.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// API ID (예: "stk_bydd_trd")
    pub api_id: String,
    /// 요청 URL
    pub url: String,
    /// 기준일 (YYYYMMDD)
    pub base_date: Option<String>,
}

/// 요청 결과.
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// 정상 응답
    Success { status: u16, rows: usize, elapsed: Duration },
    /// HTTP 오류 응답
    HttpError { status: u16, elapsed: Duration },
    /// 전송 실패 (연결, 타임아웃 등)
    TransportError { message: String, elapsed: Duration },
}

/// 요청 인터셉터.
pub trait RequestHook: Send + Sync {
    fn before_request(&self, ctx: &RequestContext);

    fn after_response(&self, ctx: &RequestContext, outcome: &RequestOutcome);
}

/// tracing 기반 기본 훅.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHook;

impl RequestHook for TracingHook {
    fn before_request(&self, ctx: &RequestContext) {
        tracing::debug!(
            api_id = %ctx.api_id,
            url = %ctx.url,
            base_date = ?ctx.base_date,
            "KRX API 요청"
        );
    }

    fn after_response(&self, ctx: &RequestContext, outcome: &RequestOutcome) {
        match outcome {
            RequestOutcome::Success { status, rows, elapsed } => tracing::debug!(
                api_id = %ctx.api_id,
                status,
                rows,
                elapsed_ms = elapsed.as_millis() as u64,
                "KRX API 응답"
            ),
            RequestOutcome::HttpError { status, elapsed } => tracing::warn!(
                api_id = %ctx.api_id,
                status,
                elapsed_ms = elapsed.as_millis() as u64,
                "KRX API 오류 응답"
            ),
            RequestOutcome::TransportError { message, elapsed } => tracing::warn!(
                api_id = %ctx.api_id,
                error = %message,
                elapsed_ms = elapsed.as_millis() as u64,
                "KRX API 전송 실패"
            ),
        }
    }
}
