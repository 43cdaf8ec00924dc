//! 일별 회전율 스냅샷 CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 한 시장/거래일의 상위 N 종목 표 출력
//! - 최근 거래일 목록 확인
//! - 캐시 전체 적재 및 시장별 건수 요약

pub mod commands;
pub mod stats;

pub use stats::{RefreshStats, SegmentCount};
