//! 시장 구분 및 거래일 정의.
//!
//! - `MarketSegment` - KRX 소속 시장 (유가증권시장, 코스닥)
//! - `TradingDay` - 명시적 거래일 또는 "가장 최근 거래일"

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Asia::Seoul;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// KRX 시장 구분.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketSegment {
    /// 유가증권시장 (메인보드)
    Kospi,
    /// 코스닥 (성장시장)
    Kosdaq,
}

impl MarketSegment {
    /// 지원하는 모든 시장.
    pub const ALL: [MarketSegment; 2] = [MarketSegment::Kospi, MarketSegment::Kosdaq];

    /// KRX Open API 시장 코드 (STK / KSQ).
    pub fn code(&self) -> &'static str {
        match self {
            MarketSegment::Kospi => "STK",
            MarketSegment::Kosdaq => "KSQ",
        }
    }

    /// 화면 표시용 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSegment::Kospi => "KOSPI",
            MarketSegment::Kosdaq => "KOSDAQ",
        }
    }
}

impl fmt::Display for MarketSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketSegment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "KOSPI" | "STK" => Ok(MarketSegment::Kospi),
            "KOSDAQ" | "KSQ" => Ok(MarketSegment::Kosdaq),
            _ => Err(CoreError::UnknownMarket(s.to_string())),
        }
    }
}

/// 조회 대상 거래일.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingDay {
    /// Provider가 판단하는 가장 최근 영업일
    MostRecent,
    /// 명시적 일자
    On(NaiveDate),
}

impl From<NaiveDate> for TradingDay {
    fn from(day: NaiveDate) -> Self {
        TradingDay::On(day)
    }
}

/// KRX 기준일 형식(YYYYMMDD)으로 변환.
pub fn to_base_date(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

/// YYYYMMDD, YYYY-MM-DD, YYYY/MM/DD 형식의 날짜 파싱.
pub fn parse_trading_date(s: &str) -> Result<NaiveDate, CoreError> {
    let s = s.trim();
    let format = if s.contains('-') {
        "%Y-%m-%d"
    } else if s.contains('/') {
        "%Y/%m/%d"
    } else {
        "%Y%m%d"
    };
    NaiveDate::parse_from_str(s, format)
        .map_err(|_| CoreError::InvalidInput(format!("날짜 형식 오류: {}", s)))
}

/// 한국 시간(KST) 기준 오늘 날짜.
pub fn kst_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Seoul).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_market_segment_parse() {
        assert_eq!("kospi".parse::<MarketSegment>().unwrap(), MarketSegment::Kospi);
        assert_eq!("KSQ".parse::<MarketSegment>().unwrap(), MarketSegment::Kosdaq);
        assert!("KONEX".parse::<MarketSegment>().is_err());
    }

    #[test]
    fn test_market_segment_serde() {
        let json = serde_json::to_string(&MarketSegment::Kosdaq).unwrap();
        assert_eq!(json, "\"KOSDAQ\"");
        let parsed: MarketSegment = serde_json::from_str("\"KOSPI\"").unwrap();
        assert_eq!(parsed, MarketSegment::Kospi);
    }

    #[test]
    fn test_parse_trading_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(parse_trading_date("20240105").unwrap(), expected);
        assert_eq!(parse_trading_date("2024-01-05").unwrap(), expected);
        assert_eq!(parse_trading_date("2024/01/05").unwrap(), expected);
        assert!(parse_trading_date("05-01-2024x").is_err());
        assert_eq!(to_base_date(expected), "20240105");
    }

    #[test]
    fn test_kst_today_crosses_midnight() {
        // UTC 16:00 = KST 다음날 01:00
        let now = Utc.with_ymd_and_hms(2024, 1, 4, 16, 0, 0).unwrap();
        assert_eq!(kst_today(now), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }
}
