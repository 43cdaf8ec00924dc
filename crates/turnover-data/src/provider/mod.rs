//! 시장 데이터 Provider 모듈.
//!
//! 외부 시장 데이터 소스를 `MarketDataProvider` trait 뒤로 숨깁니다.
//!
//! ## KRX Open API
//! - `KrxApiClient`: KRX Open API 클라이언트 (인증키 필요)
//! - 유가증권/코스닥 일별 매매정보, PER/PBR, 종목 기본정보
//!
//! ## 요청 훅
//! - `RequestHook`: HTTP 요청/응답 관찰용 인터셉터 (생성 시 주입)
//!
//! ## 테스트용
//! - `FixtureProvider`: 메모리 기반 Provider (`test-utils` feature)

pub mod hook;
pub mod krx_api;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixture;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use turnover_core::MarketSegment;

use crate::error::Result;

pub use hook::{RequestContext, RequestHook, RequestOutcome, TracingHook};
pub use krx_api::{KrxApiClient, KrxApiClientBuilder};

#[cfg(any(test, feature = "test-utils"))]
pub use fixture::{FixtureProvider, ProviderCall};

/// 시가총액/거래량 행.
///
/// 거래량과 상장주식수는 upstream이 비워 보낼 수 있으므로 Option입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCapRow {
    /// 단축코드
    pub instrument_id: String,
    /// 종가
    pub close: Option<Decimal>,
    /// 시가총액
    pub market_cap: Option<Decimal>,
    /// 거래량
    pub trading_volume: Option<u64>,
    /// 거래대금
    pub trading_value: Option<Decimal>,
    /// 상장주식수
    pub listed_shares: Option<u64>,
}

/// 가치지표 행.
///
/// PER/PBR이 산출되지 않는 종목은 0 (센티널).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRow {
    pub instrument_id: String,
    pub per: Decimal,
    pub pbr: Decimal,
    pub eps: Option<Decimal>,
    pub bps: Option<Decimal>,
    /// 배당수익률 (%)
    pub dividend_yield: Option<Decimal>,
}

/// 일별 시세 행.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRow {
    pub instrument_id: String,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    /// 등락률 (%)
    pub change_rate: Option<Decimal>,
}

/// 외부 시장 데이터 Provider.
///
/// 모든 호출은 (거래일, 시장) 단위 전종목 조회입니다.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 가장 최근 영업일 (최대 1주일 전까지 탐색).
    async fn nearest_business_day(&self) -> Result<NaiveDate>;

    /// `from..=to` 범위의 영업일 목록 (오름차순).
    async fn business_days(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>>;

    /// 시가총액/거래량/상장주식수.
    async fn market_cap(&self, day: NaiveDate, segment: MarketSegment) -> Result<Vec<MarketCapRow>>;

    /// PER/PBR 등 가치지표.
    async fn fundamentals(
        &self,
        day: NaiveDate,
        segment: MarketSegment,
    ) -> Result<Vec<FundamentalRow>>;

    /// 일별 시세 (선택 데이터, 실패해도 스냅샷 생성은 계속됨).
    async fn ohlcv(&self, day: NaiveDate, segment: MarketSegment) -> Result<Vec<OhlcvRow>>;

    /// 종목코드 → 종목명.
    async fn instrument_name(&self, instrument_id: &str) -> Result<String>;
}
