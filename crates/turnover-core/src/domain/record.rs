//! 종목 레코드와 일별 스냅샷.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::calculations::turnover_ratio;
use super::market::MarketSegment;

/// 하루치 종목 데이터 한 행.
///
/// 회전율은 저장하지 않고 거래량/상장주식수에서 매번 계산합니다.
/// PER/PBR의 0은 "산출 불가"를 뜻하는 센티널 값입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    /// 단축코드 (6자리)
    pub instrument_id: String,
    /// 종목명
    pub name: String,
    /// 거래량
    pub trading_volume: u64,
    /// 상장주식수
    pub listed_shares: u64,
    /// 시가총액
    pub market_cap: Option<Decimal>,
    /// 거래대금
    pub trading_value: Option<Decimal>,
    /// PER (0 = 산출 불가)
    pub per: Decimal,
    /// PBR (0 = 산출 불가)
    pub pbr: Decimal,
    /// EPS
    pub eps: Option<Decimal>,
    /// BPS
    pub bps: Option<Decimal>,
    /// 배당수익률 (%)
    pub dividend_yield: Option<Decimal>,
    /// 등락률 (%)
    pub change_rate: Option<Decimal>,
    /// 시가
    pub open_price: Option<Decimal>,
    /// 고가
    pub high_price: Option<Decimal>,
    /// 저가
    pub low_price: Option<Decimal>,
    /// 종가
    pub close_price: Option<Decimal>,
}

impl InstrumentRecord {
    /// 일일 회전율 (%).
    pub fn turnover_ratio(&self) -> Decimal {
        turnover_ratio(self.trading_volume, self.listed_shares)
    }

    /// PER 값이 유효한지 (센티널 0이 아닌지).
    pub fn has_per(&self) -> bool {
        !self.per.is_zero()
    }

    /// PBR 값이 유효한지 (센티널 0이 아닌지).
    pub fn has_pbr(&self) -> bool {
        !self.pbr.is_zero()
    }
}

/// (시장, 거래일) 단위의 불변 스냅샷.
///
/// 생성 후에는 변경할 수 없으며, 갱신 시 통째로 교체됩니다.
/// 레코드 순서는 upstream 응답 순서를 유지합니다.
#[derive(Debug, Clone)]
pub struct DailySnapshot {
    segment: MarketSegment,
    day: NaiveDate,
    records: Vec<InstrumentRecord>,
    index: HashMap<String, usize>,
}

impl DailySnapshot {
    /// 새 스냅샷 생성.
    ///
    /// 같은 종목코드가 중복되면 처음 나온 행만 유지합니다.
    pub fn new(segment: MarketSegment, day: NaiveDate, records: Vec<InstrumentRecord>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        let mut unique = Vec::with_capacity(records.len());

        for record in records {
            if index.contains_key(&record.instrument_id) {
                tracing::debug!(
                    instrument_id = %record.instrument_id,
                    segment = %segment,
                    %day,
                    "중복 종목 무시"
                );
                continue;
            }
            index.insert(record.instrument_id.clone(), unique.len());
            unique.push(record);
        }

        Self {
            segment,
            day,
            records: unique,
            index,
        }
    }

    pub fn segment(&self) -> MarketSegment {
        self.segment
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    /// 종목코드로 레코드 조회.
    pub fn get(&self, instrument_id: &str) -> Option<&InstrumentRecord> {
        self.index.get(instrument_id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, instrument_id: &str) -> bool {
        self.index.contains_key(instrument_id)
    }

    /// upstream 순서대로 레코드 반환.
    pub fn records(&self) -> &[InstrumentRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstrumentRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
    }

    #[test]
    fn test_turnover_follows_inputs() {
        let mut r = record("005930", 500, 1_000);
        assert_eq!(r.turnover_ratio(), dec!(50));

        r.trading_volume = 100;
        assert_eq!(r.turnover_ratio(), dec!(10));

        r.listed_shares = 0;
        assert_eq!(r.turnover_ratio(), Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_lookup_and_order() {
        let snapshot = DailySnapshot::new(
            MarketSegment::Kospi,
            day(),
            vec![record("000660", 1, 1), record("005930", 2, 1)],
        );

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("005930").unwrap().trading_volume, 2);
        assert!(snapshot.get("035720").is_none());
        let ids: Vec<_> = snapshot.iter().map(|r| r.instrument_id.as_str()).collect();
        assert_eq!(ids, vec!["000660", "005930"]);
    }

    #[test]
    fn test_snapshot_keeps_first_duplicate() {
        let snapshot = DailySnapshot::new(
            MarketSegment::Kosdaq,
            day(),
            vec![record("035720", 10, 1), record("035720", 99, 1)],
        );

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("035720").unwrap().trading_volume, 10);
    }

    #[test]
    fn test_sentinel_fundamentals() {
        let mut r = record("005930", 1, 1);
        r.per = Decimal::ZERO;
        assert!(!r.has_per());
        assert!(r.has_pbr());
    }
}
