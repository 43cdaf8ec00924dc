//! 핵심 도메인 에러 타입.

use thiserror::Error;

/// 도메인 계층 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 알 수 없는 시장 구분
    #[error("알 수 없는 시장: {0}")]
    UnknownMarket(String),

    /// 알 수 없는 정렬 토큰
    #[error("알 수 없는 정렬 기준: {0}")]
    UnknownSort(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),
}

/// 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// 사용자 입력(쿼리 파라미터, CLI 인자) 때문에 발생한 에러인지 확인합니다.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownMarket(_) | CoreError::UnknownSort(_) | CoreError::InvalidInput(_)
        )
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}
