//! # Turnover Core
//!
//! KRX 일별 회전율 스냅샷 서비스의 핵심 도메인 모델을 제공합니다.
//!
//! 이 크레이트는 서비스 전반에서 사용되는 기본 타입을 제공합니다:
//! - 시장 구분 및 거래일 타입
//! - 종목 레코드와 일별 스냅샷
//! - 회전율 및 거래량 증가율 계산
//! - 정렬/필터 기반 스크리닝
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod screen;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use screen::*;
