//! 만료형 스냅샷 캐시.
//!
//! 최근 N 거래일 × 시장별 `DailySnapshot` 묶음을 메모리에 보관하고,
//! TTL이 지나면 다음 조회 시 통째로 다시 수집합니다.
//!
//! # 동시성
//!
//! 만료된 묶음의 "갱신 → 반환"은 갱신 전용 `tokio::sync::Mutex`로 직렬화합니다.
//! 갱신 중 들어온 조회는 같은 락에서 대기한 뒤 새 묶음을 받습니다.
//! 공개된 묶음은 별도의 `RwLock`에 두고 교체 시점에만 씁니다. 상태 조회는
//! 갱신을 기다리지 않으며, 조회자는 항상 이전 묶음 전체나 새 묶음 전체 중
//! 하나만 봅니다.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use metrics::counter;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn, Instrument};
use turnover_core::{snapshot_span, CacheConfig, DailySnapshot, MarketSegment, TradingDay};

use crate::error::{DataError, Result};
use crate::fetcher::FundamentalsFetcher;

/// 한 번의 갱신으로 만들어진 스냅샷 묶음.
#[derive(Debug, Clone)]
pub struct SnapshotSet {
    /// 거래일 목록 (최신순)
    days: Vec<NaiveDate>,
    snapshots: HashMap<MarketSegment, HashMap<NaiveDate, DailySnapshot>>,
    refreshed_at: DateTime<Utc>,
}

impl SnapshotSet {
    pub fn new(days: Vec<NaiveDate>, refreshed_at: DateTime<Utc>) -> Self {
        Self {
            days,
            snapshots: HashMap::new(),
            refreshed_at,
        }
    }

    pub fn insert(&mut self, snapshot: DailySnapshot) {
        self.snapshots
            .entry(snapshot.segment())
            .or_default()
            .insert(snapshot.day(), snapshot);
    }

    /// 거래일 목록 (최신순).
    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn get(&self, segment: MarketSegment, day: NaiveDate) -> Option<&DailySnapshot> {
        self.snapshots.get(&segment).and_then(|by_day| by_day.get(&day))
    }

    /// 시장별 스냅샷을 최신순으로 반환합니다. 없는 거래일은 건너뜁니다.
    pub fn window(&self, segment: MarketSegment) -> Vec<&DailySnapshot> {
        self.days
            .iter()
            .filter_map(|day| self.get(segment, *day))
            .collect()
    }

    pub fn segments(&self) -> Vec<MarketSegment> {
        let mut segments: Vec<MarketSegment> = self.snapshots.keys().copied().collect();
        segments.sort();
        segments
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }

    /// 시장별 전체 레코드 수.
    pub fn record_count(&self, segment: MarketSegment) -> usize {
        self.snapshots
            .get(&segment)
            .map(|by_day| by_day.values().map(DailySnapshot::len).sum())
            .unwrap_or(0)
    }
}

/// 캐시 상태 요약 (헬스체크/CLI 출력용).
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub populated: bool,
    pub stale: bool,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub age_secs: Option<u64>,
    pub ttl_secs: u64,
    pub days: Vec<NaiveDate>,
    pub segments: Vec<MarketSegment>,
    /// 갱신 진행 중 여부
    pub refreshing: bool,
    pub hits: u64,
    pub refreshes: u64,
    pub failures: u64,
}

/// 스냅샷 조회 인터페이스.
///
/// 웹 계층은 이 trait만 알고, 갱신 방식(조회 시 갱신/백그라운드)은 모릅니다.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// 현재 유효한 스냅샷 묶음. 필요하면 갱신 후 반환합니다.
    async fn snapshot(&self) -> Result<Arc<SnapshotSet>>;

    async fn status(&self) -> CacheStatus;
}

/// 캐시 동작 설정.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    /// 보관할 거래일 수
    pub window_days: usize,
    /// 거래일 목록 조회 시 거슬러 올라갈 달력일 수
    pub lookback_days: i64,
    pub segments: Vec<MarketSegment>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            ttl: config.ttl(),
            window_days: config.window_days,
            lookback_days: config.lookback_days,
            segments: config.segments.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    current: Option<Arc<SnapshotSet>>,
    refreshed_at: Option<Instant>,
}

impl CacheState {
    fn fresh(&self, ttl: Duration) -> Option<Arc<SnapshotSet>> {
        match (&self.current, self.refreshed_at) {
            (Some(current), Some(at)) if at.elapsed() < ttl => Some(current.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

/// TTL 기반 스냅샷 캐시.
pub struct SnapshotCache {
    fetcher: FundamentalsFetcher,
    settings: CacheSettings,
    /// 교체 시점에만 쓰는 공개 묶음
    published: RwLock<CacheState>,
    /// 갱신 직렬화
    refresh_lock: Mutex<()>,
    stats: CacheStats,
}

impl SnapshotCache {
    pub fn new(fetcher: FundamentalsFetcher, settings: CacheSettings) -> Self {
        Self {
            fetcher,
            settings,
            published: RwLock::new(CacheState::default()),
            refresh_lock: Mutex::new(()),
            stats: CacheStats::default(),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn fetcher(&self) -> &FundamentalsFetcher {
        &self.fetcher
    }

    /// 현재 스냅샷 묶음을 반환합니다.
    ///
    /// 만료되었으면 갱신합니다. 갱신이 실패해도 이전 묶음이 있으면 그것을 반환하고,
    /// 한 번도 채워진 적이 없을 때만 오류를 돌려줍니다.
    #[instrument(skip(self))]
    pub async fn get_snapshot(&self) -> Result<Arc<SnapshotSet>> {
        if let Some(current) = self.fresh().await {
            return Ok(self.hit(current));
        }

        let _guard = self.refresh_lock.lock().await;

        // 대기하는 동안 다른 조회가 갱신을 마쳤을 수 있음
        if let Some(current) = self.fresh().await {
            return Ok(self.hit(current));
        }

        match self.refresh_locked().await {
            Ok(set) => Ok(set),
            Err(e) => match self.published.read().await.current.clone() {
                Some(previous) => {
                    warn!(error = %e, "스냅샷 갱신 실패, 이전 데이터 유지");
                    Ok(previous)
                }
                None => Err(e),
            },
        }
    }

    async fn fresh(&self) -> Option<Arc<SnapshotSet>> {
        self.published.read().await.fresh(self.settings.ttl)
    }

    fn hit(&self, current: Arc<SnapshotSet>) -> Arc<SnapshotSet> {
        self.stats.hits.fetch_add(1, Ordering::Relaxed);
        counter!("snapshot_cache_hits_total").increment(1);
        current
    }

    /// 만료 여부와 관계없이 즉시 갱신합니다.
    ///
    /// 실패하면 이전 묶음은 그대로 두고 오류를 반환합니다.
    pub async fn refresh_now(&self) -> Result<Arc<SnapshotSet>> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// 시작 시 미리 적재합니다. 실패하면 로그만 남기고 조회 시 갱신으로 넘어갑니다.
    pub async fn warm(&self) -> bool {
        match self.refresh_now().await {
            Ok(set) => {
                info!(days = set.days().len(), "스냅샷 캐시 사전 적재 완료");
                true
            }
            Err(e) => {
                warn!(error = %e, "스냅샷 캐시 사전 적재 실패, 첫 조회 시 재시도");
                false
            }
        }
    }

    /// `interval`마다 강제 갱신하는 백그라운드 태스크를 시작합니다.
    ///
    /// 첫 갱신은 `interval` 후에 일어납니다.
    pub fn spawn_refresher(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("백그라운드 갱신 종료");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = cache.refresh_now().await {
                            warn!(error = %e, "백그라운드 갱신 실패");
                        }
                    }
                }
            }
        })
    }

    /// 최근 거래일 목록 (최신순, 최대 `window_days`개).
    #[instrument(skip(self))]
    pub async fn trading_window(&self) -> Result<Vec<NaiveDate>> {
        let provider = self.fetcher.provider();
        let newest = provider.nearest_business_day().await?;
        let from = newest - ChronoDuration::days(self.settings.lookback_days);

        let mut days = provider.business_days(from, newest).await?;
        days.sort_unstable_by(|a, b| b.cmp(a));
        days.truncate(self.settings.window_days);

        if days.is_empty() {
            return Err(DataError::UpstreamUnavailable(format!(
                "{} ~ {} 범위에 영업일이 없습니다",
                from, newest
            )));
        }
        Ok(days)
    }

    /// `refresh_lock`을 잡은 상태에서만 호출합니다.
    async fn refresh_locked(&self) -> Result<Arc<SnapshotSet>> {
        let started = std::time::Instant::now();

        match self.build_set().await {
            Ok(set) => {
                let set = Arc::new(set);
                {
                    let mut published = self.published.write().await;
                    published.current = Some(set.clone());
                    published.refreshed_at = Some(Instant::now());
                }

                self.stats.refreshes.fetch_add(1, Ordering::Relaxed);
                counter!("snapshot_cache_refresh_total", "result" => "success").increment(1);
                info!(
                    days = set.days().len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "스냅샷 캐시 갱신 완료"
                );
                Ok(set)
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                counter!("snapshot_cache_refresh_total", "result" => "failure").increment(1);
                Err(e)
            }
        }
    }

    async fn build_set(&self) -> Result<SnapshotSet> {
        let days = self.trading_window().await?;
        let mut set = SnapshotSet::new(days.clone(), Utc::now());

        for segment in &self.settings.segments {
            for day in &days {
                let snapshot = self
                    .fetcher
                    .fetch(TradingDay::On(*day), *segment)
                    .instrument(snapshot_span!("snapshot_refresh", segment, day))
                    .await?;
                set.insert(snapshot);
            }
        }

        Ok(set)
    }

    /// 현재 상태. 진행 중인 갱신을 기다리지 않습니다.
    pub async fn status(&self) -> CacheStatus {
        let state = self.published.read().await;
        let ttl = self.settings.ttl;

        CacheStatus {
            populated: state.current.is_some(),
            stale: state.fresh(ttl).is_none(),
            refreshed_at: state.current.as_ref().map(|set| set.refreshed_at()),
            age_secs: state.refreshed_at.map(|at| at.elapsed().as_secs()),
            ttl_secs: ttl.as_secs(),
            days: state
                .current
                .as_ref()
                .map(|set| set.days().to_vec())
                .unwrap_or_default(),
            segments: self.settings.segments.clone(),
            refreshing: self.refresh_lock.try_lock().is_err(),
            hits: self.stats.hits.load(Ordering::Relaxed),
            refreshes: self.stats.refreshes.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl SnapshotStore for SnapshotCache {
    async fn snapshot(&self) -> Result<Arc<SnapshotSet>> {
        self.get_snapshot().await
    }

    async fn status(&self) -> CacheStatus {
        SnapshotCache::status(self).await
    }
}
