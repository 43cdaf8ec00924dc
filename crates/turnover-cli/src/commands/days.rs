//! 최근 거래일 목록 조회.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use turnover_data::SnapshotCache;

/// 캐시가 적재할 거래일 목록 (최신순).
pub async fn days(cache: &SnapshotCache) -> Result<Vec<NaiveDate>> {
    cache
        .trading_window()
        .await
        .context("거래일 목록 조회 실패")
}

/// 한 줄에 하나씩 YYYY-MM-DD로 출력합니다.
pub fn render(days: &[NaiveDate]) -> String {
    days.iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
