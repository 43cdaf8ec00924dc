//! 메모리 기반 테스트용 Provider.
//!
//! 호출 횟수 집계, 일자별 실패 주입, 인위적 지연을 지원합니다.
//! 테스트 중에도 `&self`로 상태를 바꿀 수 있어 `Arc`로 공유한 뒤 조작할 수 있습니다.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use turnover_core::MarketSegment;

use super::{FundamentalRow, MarketCapRow, MarketDataProvider, OhlcvRow};
use crate::error::{DataError, Result};

/// 집계 대상 Provider 호출 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderCall {
    NearestBusinessDay,
    BusinessDays,
    MarketCap,
    Fundamentals,
    Ohlcv,
    InstrumentName,
}

type DayKey = (NaiveDate, MarketSegment);

#[derive(Debug, Default)]
struct FixtureState {
    business_days: BTreeSet<NaiveDate>,
    market_caps: HashMap<DayKey, Vec<MarketCapRow>>,
    fundamentals: HashMap<DayKey, Vec<FundamentalRow>>,
    ohlcv: HashMap<DayKey, Vec<OhlcvRow>>,
    names: HashMap<String, String>,
    failing_days: HashSet<NaiveDate>,
    failing_ohlcv: bool,
    calls: HashMap<ProviderCall, usize>,
    latency: Option<Duration>,
}

/// 고정 데이터를 돌려주는 `MarketDataProvider`.
#[derive(Debug, Default)]
pub struct FixtureProvider {
    state: Mutex<FixtureState>,
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FixtureState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// 모든 호출에 지연을 추가합니다 (`tokio::time::sleep`).
    pub fn with_latency(self, latency: Duration) -> Self {
        self.with_state(|s| s.latency = Some(latency));
        self
    }

    pub fn add_business_day(&self, day: NaiveDate) {
        self.with_state(|s| {
            s.business_days.insert(day);
        });
    }

    pub fn set_market_cap(&self, day: NaiveDate, segment: MarketSegment, rows: Vec<MarketCapRow>) {
        self.with_state(|s| {
            s.business_days.insert(day);
            s.market_caps.insert((day, segment), rows);
        });
    }

    pub fn set_fundamentals(
        &self,
        day: NaiveDate,
        segment: MarketSegment,
        rows: Vec<FundamentalRow>,
    ) {
        self.with_state(|s| {
            s.fundamentals.insert((day, segment), rows);
        });
    }

    pub fn set_ohlcv(&self, day: NaiveDate, segment: MarketSegment, rows: Vec<OhlcvRow>) {
        self.with_state(|s| {
            s.ohlcv.insert((day, segment), rows);
        });
    }

    pub fn set_name(&self, instrument_id: &str, name: &str) {
        self.with_state(|s| {
            s.names.insert(instrument_id.to_string(), name.to_string());
        });
    }

    /// 시가총액/가치지표 양쪽에 한 종목을 추가합니다.
    #[allow(clippy::too_many_arguments)]
    pub fn add_instrument(
        &self,
        day: NaiveDate,
        segment: MarketSegment,
        instrument_id: &str,
        name: &str,
        trading_volume: u64,
        listed_shares: u64,
        per: Decimal,
        pbr: Decimal,
    ) {
        self.with_state(|s| {
            s.business_days.insert(day);
            s.market_caps.entry((day, segment)).or_default().push(MarketCapRow {
                instrument_id: instrument_id.to_string(),
                close: None,
                market_cap: None,
                trading_volume: Some(trading_volume),
                trading_value: None,
                listed_shares: Some(listed_shares),
            });
            s.fundamentals.entry((day, segment)).or_default().push(FundamentalRow {
                instrument_id: instrument_id.to_string(),
                per,
                pbr,
                eps: None,
                bps: None,
                dividend_yield: None,
            });
            s.names.insert(instrument_id.to_string(), name.to_string());
        });
    }

    /// 해당 일자의 모든 일별 조회를 실패시킵니다.
    pub fn fail_on(&self, day: NaiveDate) {
        self.with_state(|s| {
            s.failing_days.insert(day);
        });
    }

    pub fn clear_failures(&self) {
        self.with_state(|s| {
            s.failing_days.clear();
            s.failing_ohlcv = false;
        });
    }

    /// 일별 시세 조회만 실패시킵니다.
    pub fn fail_ohlcv(&self) {
        self.with_state(|s| s.failing_ohlcv = true);
    }

    /// 호출 종류별 누적 횟수.
    pub fn calls(&self, call: ProviderCall) -> usize {
        self.with_state(|s| s.calls.get(&call).copied().unwrap_or(0))
    }

    /// 전체 누적 호출 횟수.
    pub fn total_calls(&self) -> usize {
        self.with_state(|s| s.calls.values().sum())
    }

    async fn enter(&self, call: ProviderCall, day: Option<NaiveDate>) -> Result<()> {
        let (latency, failing) = self.with_state(|s| {
            *s.calls.entry(call).or_insert(0) += 1;
            let failing = day.is_some_and(|d| s.failing_days.contains(&d))
                || (call == ProviderCall::Ohlcv && s.failing_ohlcv);
            (s.latency, failing)
        });

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if failing {
            return Err(DataError::UpstreamUnavailable(format!(
                "fixture failure: {:?} {:?}",
                call, day
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataProvider for FixtureProvider {
    async fn nearest_business_day(&self) -> Result<NaiveDate> {
        self.enter(ProviderCall::NearestBusinessDay, None).await?;
        self.with_state(|s| s.business_days.iter().next_back().copied())
            .ok_or_else(|| DataError::UpstreamUnavailable("영업일 없음".to_string()))
    }

    async fn business_days(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>> {
        self.enter(ProviderCall::BusinessDays, None).await?;
        Ok(self.with_state(|s| s.business_days.range(from..=to).copied().collect()))
    }

    async fn market_cap(&self, day: NaiveDate, segment: MarketSegment) -> Result<Vec<MarketCapRow>> {
        self.enter(ProviderCall::MarketCap, Some(day)).await?;
        Ok(self.with_state(|s| s.market_caps.get(&(day, segment)).cloned().unwrap_or_default()))
    }

    async fn fundamentals(
        &self,
        day: NaiveDate,
        segment: MarketSegment,
    ) -> Result<Vec<FundamentalRow>> {
        self.enter(ProviderCall::Fundamentals, Some(day)).await?;
        Ok(self.with_state(|s| s.fundamentals.get(&(day, segment)).cloned().unwrap_or_default()))
    }

    async fn ohlcv(&self, day: NaiveDate, segment: MarketSegment) -> Result<Vec<OhlcvRow>> {
        self.enter(ProviderCall::Ohlcv, Some(day)).await?;
        Ok(self.with_state(|s| s.ohlcv.get(&(day, segment)).cloned().unwrap_or_default()))
    }

    async fn instrument_name(&self, instrument_id: &str) -> Result<String> {
        self.enter(ProviderCall::InstrumentName, None).await?;
        self.with_state(|s| s.names.get(instrument_id).cloned())
            .ok_or_else(|| DataError::UpstreamUnavailable(format!("종목명 없음: {}", instrument_id)))
    }
}
