//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    /// 외부 데이터 소스 호출 실패 또는 해당 일자 데이터 없음
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// 조인 후 필수 컬럼(거래량, 상장주식수) 누락
    #[error("Incomplete data: {0}")]
    IncompleteData(String),

    /// 파싱 오류
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DataError {
    /// 외부 소스 문제로 발생한 오류인지 확인합니다.
    pub fn is_upstream(&self) -> bool {
        matches!(self, DataError::UpstreamUnavailable(_))
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        DataError::UpstreamUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
