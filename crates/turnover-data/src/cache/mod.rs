//! 캐싱 레이어.
//!
//! - Snapshot 캐시: 최근 거래일 × 시장별 일별 스냅샷 (TTL 만료 시 일괄 갱신)

pub mod snapshot;

pub use snapshot::{CacheSettings, CacheStatus, SnapshotCache, SnapshotSet, SnapshotStore};
