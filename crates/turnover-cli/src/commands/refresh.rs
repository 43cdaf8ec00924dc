//! 캐시 전체 적재.

use anyhow::{Context, Result};
use std::time::Instant;
use turnover_data::SnapshotCache;

use crate::stats::{RefreshStats, SegmentCount};

/// 설정된 모든 시장과 거래일을 한 번 적재하고 시장별 건수를 반환합니다.
pub async fn refresh(cache: &SnapshotCache) -> Result<RefreshStats> {
    let started = Instant::now();
    let set = cache.refresh_now().await.context("스냅샷 적재 실패")?;

    let segments = cache
        .settings()
        .segments
        .iter()
        .map(|segment| SegmentCount {
            segment: *segment,
            days: set.window(*segment).len(),
            records: set.record_count(*segment),
        })
        .collect();

    Ok(RefreshStats {
        days: set.days().to_vec(),
        segments,
        elapsed: started.elapsed(),
    })
}
