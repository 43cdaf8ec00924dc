//! 시장 데이터 수집 및 캐싱.
//!
//! 이 crate는 다음을 제공합니다:
//! - KRX Open API 기반 시장 데이터 Provider
//! - (거래일, 시장) 단위 일별 스냅샷 수집기
//! - TTL 기반 스냅샷 캐시 (조회 시 갱신 / 백그라운드 갱신)

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod provider;

pub use error::{DataError, Result};
pub use fetcher::FundamentalsFetcher;

pub use cache::{CacheSettings, CacheStatus, SnapshotCache, SnapshotSet, SnapshotStore};

pub use provider::{
    FundamentalRow, KrxApiClient, MarketCapRow, MarketDataProvider, OhlcvRow, RequestContext,
    RequestHook, RequestOutcome, TracingHook,
};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::{FixtureProvider, ProviderCall};
