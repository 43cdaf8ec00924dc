//! 화면/JSON 공용 스냅샷 뷰 모델.
//!
//! 캐시의 `SnapshotSet`을 거래일별 표로 변환합니다.
//! 연속 거래량 증가 필터는 가장 최근 4 거래일로 한 번 판정하고,
//! 통과한 종목만 모든 거래일 표에 표시합니다.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use turnover_core::{
    has_consecutive_volume_growth, rank, CoreResult, DailySnapshot, InstrumentRecord,
    MarketSegment, SortSpec, ViewConfig,
};
use turnover_data::SnapshotSet;

use super::color::rate_color;

/// 조회 쿼리 파라미터 (`?market=KOSDAQ&sort=turnover_desc&growth=true`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewQuery {
    pub market: Option<String>,
    pub sort: Option<String>,
    pub growth: Option<bool>,
}

/// 기본값이 채워진 조회 조건.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRequest {
    pub market: MarketSegment,
    pub sort: SortSpec,
    /// 연속 거래량 증가 필터 적용 여부
    pub growth: bool,
}

impl ViewRequest {
    /// 쿼리를 해석합니다. 비어 있는 값은 설정 기본값을 사용합니다.
    pub fn resolve(query: &ViewQuery, config: &ViewConfig) -> CoreResult<Self> {
        let market = match query.market.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.parse()?,
            _ => config.default_market,
        };
        let sort = match query.sort.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.parse()?,
            _ => config.default_sort,
        };

        Ok(Self {
            market,
            sort,
            growth: query.growth.unwrap_or(false),
        })
    }
}

/// 표의 한 행.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayRow {
    pub rank: usize,
    pub instrument_id: String,
    pub name: String,
    pub trading_volume: u64,
    /// 일일 회전율 (%, 소수 둘째 자리)
    pub turnover_ratio: Decimal,
    pub change_rate: Option<Decimal>,
    pub close_price: Option<Decimal>,
    pub per: Decimal,
    pub pbr: Decimal,
    /// 등락률 셀 배경색
    pub rate_color: String,
}

impl DisplayRow {
    fn from_record(rank: usize, record: &InstrumentRecord) -> Self {
        Self {
            rank,
            instrument_id: record.instrument_id.clone(),
            name: record.name.clone(),
            trading_volume: record.trading_volume,
            turnover_ratio: record.turnover_ratio().round_dp(2),
            change_rate: record.change_rate,
            close_price: record.close_price,
            per: record.per,
            pbr: record.pbr,
            rate_color: rate_color(record.change_rate),
        }
    }
}

/// 거래일 하나의 표.
#[derive(Debug, Clone, Serialize)]
pub struct DayTable {
    pub day: NaiveDate,
    /// YYYY-MM-DD
    pub date: String,
    /// 스냅샷이 존재하고 비어 있지 않은지
    pub has_data: bool,
    /// 등락률 컬럼 표시 여부 (해당 일자에 값이 하나라도 있을 때)
    pub show_change_rate: bool,
    /// 종가 컬럼 표시 여부
    pub show_close_price: bool,
    pub rows: Vec<DisplayRow>,
}

impl DayTable {
    fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            date: day.format("%Y-%m-%d").to_string(),
            has_data: false,
            show_change_rate: false,
            show_close_price: false,
            rows: Vec::new(),
        }
    }
}

/// 한 시장의 전체 화면 데이터.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotView {
    pub market: MarketSegment,
    pub sort: SortSpec,
    pub growth: bool,
    pub refreshed_at: DateTime<Utc>,
    pub days: Vec<DayTable>,
}

impl SnapshotView {
    pub fn build(set: &SnapshotSet, request: &ViewRequest, config: &ViewConfig) -> Self {
        let window = set.window(request.market);

        let qualified: Option<HashSet<&str>> = request.growth.then(|| {
            window
                .first()
                .map(|current| {
                    current
                        .iter()
                        .filter(|r| {
                            has_consecutive_volume_growth(
                                &r.instrument_id,
                                &window,
                                config.growth_threshold,
                            )
                        })
                        .map(|r| r.instrument_id.as_str())
                        .collect()
                })
                .unwrap_or_default()
        });

        let days = set
            .days()
            .iter()
            .map(|day| match set.get(request.market, *day) {
                Some(snapshot) if !snapshot.is_empty() => {
                    day_table(snapshot, request.sort, config.row_limit, qualified.as_ref())
                }
                _ => DayTable::empty(*day),
            })
            .collect();

        Self {
            market: request.market,
            sort: request.sort,
            growth: request.growth,
            refreshed_at: set.refreshed_at(),
            days,
        }
    }
}

fn day_table(
    snapshot: &DailySnapshot,
    sort: SortSpec,
    limit: usize,
    qualified: Option<&HashSet<&str>>,
) -> DayTable {
    let candidates = snapshot
        .iter()
        .filter(|r| qualified.map_or(true, |ids| ids.contains(r.instrument_id.as_str())));

    let rows: Vec<DisplayRow> = rank(candidates, sort, limit)
        .into_iter()
        .enumerate()
        .map(|(i, record)| DisplayRow::from_record(i + 1, record))
        .collect();

    DayTable {
        show_change_rate: snapshot.iter().any(|r| r.change_rate.is_some()),
        show_close_price: snapshot.iter().any(|r| r.close_price.is_some()),
        has_data: true,
        rows,
        ..DayTable::empty(snapshot.day())
    }
}
