//! 일별 가치지표 수집기.
//!
//! (거래일, 시장) 하나에 대해 시가총액/거래량과 PER/PBR을 조회해
//! 종목코드로 inner join한 뒤 `DailySnapshot`을 만듭니다.
//!
//! # 처리 순서
//!
//! 1. `TradingDay::MostRecent`는 Provider의 최근 영업일로 변환
//! 2. 시가총액 행과 가치지표 행을 종목코드로 inner join (한쪽에만 있는 종목은 제외)
//! 3. 일별 시세가 있으면 다시 inner join, 실패하거나 비어 있으면 시세 필드는 None
//! 4. 종목명 조회 (실패해 종목코드로 대신한 경우까지 수집기 수명 동안 보관)
//! 5. `ZeroFilter` 정책 적용

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use turnover_core::{DailySnapshot, InstrumentRecord, MarketSegment, TradingDay, ZeroFilter};

use crate::error::{DataError, Result};
use crate::provider::{FundamentalRow, MarketDataProvider, OhlcvRow};

/// 일별 스냅샷 수집기.
pub struct FundamentalsFetcher {
    provider: Arc<dyn MarketDataProvider>,
    zero_filter: ZeroFilter,
    names: RwLock<HashMap<String, String>>,
}

impl FundamentalsFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            zero_filter: ZeroFilter::default(),
            names: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_zero_filter(mut self, zero_filter: ZeroFilter) -> Self {
        self.zero_filter = zero_filter;
        self
    }

    pub fn provider(&self) -> &Arc<dyn MarketDataProvider> {
        &self.provider
    }

    pub fn zero_filter(&self) -> ZeroFilter {
        self.zero_filter
    }

    /// 거래일 지정을 실제 날짜로 변환합니다.
    pub async fn resolve_day(&self, day: TradingDay) -> Result<NaiveDate> {
        match day {
            TradingDay::MostRecent => self.provider.nearest_business_day().await,
            TradingDay::On(date) => Ok(date),
        }
    }

    /// 하루치 스냅샷을 생성합니다.
    ///
    /// # Errors
    ///
    /// - `UpstreamUnavailable`: Provider 호출 실패 또는 해당 일자 데이터 없음
    /// - `IncompleteData`: join 후 거래량/상장주식수 누락
    #[instrument(skip(self), fields(rows = tracing::field::Empty))]
    pub async fn fetch(&self, day: TradingDay, segment: MarketSegment) -> Result<DailySnapshot> {
        let started = Instant::now();
        let day = self.resolve_day(day).await?;

        let market_caps = self.provider.market_cap(day, segment).await?;
        let fundamentals = self.provider.fundamentals(day, segment).await?;

        if market_caps.is_empty() || fundamentals.is_empty() {
            return Err(DataError::UpstreamUnavailable(format!(
                "{} {} 데이터 없음 (시가총액 {}행, 가치지표 {}행)",
                segment,
                day,
                market_caps.len(),
                fundamentals.len()
            )));
        }

        let ohlcv = self.load_ohlcv(day, segment).await;

        let fundamentals: HashMap<String, FundamentalRow> = fundamentals
            .into_iter()
            .map(|row| (row.instrument_id.clone(), row))
            .collect();

        let mut records = Vec::with_capacity(market_caps.len());
        for cap in market_caps {
            let Some(fundamental) = fundamentals.get(&cap.instrument_id) else {
                continue;
            };

            let price = match &ohlcv {
                Some(rows) => match rows.get(&cap.instrument_id) {
                    Some(row) => Some(row),
                    None => continue,
                },
                None => None,
            };

            let (Some(trading_volume), Some(listed_shares)) = (cap.trading_volume, cap.listed_shares)
            else {
                return Err(DataError::IncompleteData(format!(
                    "{} {} {}: 거래량 또는 상장주식수 누락",
                    segment, day, cap.instrument_id
                )));
            };

            let name = self.lookup_name(&cap.instrument_id).await;

            records.push(InstrumentRecord {
                name,
                trading_volume,
                listed_shares,
                market_cap: cap.market_cap,
                trading_value: cap.trading_value,
                per: fundamental.per,
                pbr: fundamental.pbr,
                eps: fundamental.eps,
                bps: fundamental.bps,
                dividend_yield: fundamental.dividend_yield,
                change_rate: price.and_then(|p| p.change_rate),
                open_price: price.and_then(|p| p.open),
                high_price: price.and_then(|p| p.high),
                low_price: price.and_then(|p| p.low),
                close_price: price.and_then(|p| p.close).or(cap.close),
                instrument_id: cap.instrument_id,
            });
        }

        let joined = records.len();
        let zero_filter = self.zero_filter;
        records.retain(|r| zero_filter.retains(r));

        tracing::Span::current().record("rows", records.len());
        info!(
            segment = %segment,
            day = %day,
            joined,
            rows = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "일별 스냅샷 수집 완료"
        );

        Ok(DailySnapshot::new(segment, day, records))
    }

    /// 일별 시세를 조회합니다. 실패하거나 비어 있으면 None.
    async fn load_ohlcv(
        &self,
        day: NaiveDate,
        segment: MarketSegment,
    ) -> Option<HashMap<String, OhlcvRow>> {
        match self.provider.ohlcv(day, segment).await {
            Ok(rows) if !rows.is_empty() => Some(
                rows.into_iter()
                    .map(|row| (row.instrument_id.clone(), row))
                    .collect(),
            ),
            Ok(_) => {
                debug!(segment = %segment, day = %day, "일별 시세 없음, 시세 필드 생략");
                None
            }
            Err(e) => {
                warn!(segment = %segment, day = %day, error = %e, "일별 시세 조회 실패, 시세 필드 생략");
                None
            }
        }
    }

    /// 종목명을 조회합니다. 실패하면 종목코드를 이름으로 보관합니다.
    async fn lookup_name(&self, instrument_id: &str) -> String {
        if let Some(name) = self.names.read().await.get(instrument_id) {
            return name.clone();
        }

        let name = match self.provider.instrument_name(instrument_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!(instrument_id, error = %e, "종목명 조회 실패, 종목코드 사용");
                instrument_id.to_string()
            }
        };

        self.names
            .write()
            .await
            .insert(instrument_id.to_string(), name.clone());
        name
    }
}
