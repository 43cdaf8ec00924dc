//! 스냅샷 스크리닝 (필터 + 정렬 + 상위 N개).
//!
//! 이미 조회된 `DailySnapshot` 위에서만 동작하는 순수 함수들입니다.
//!
//! ```text
//! window[0] (표시할 거래일)
//!     │
//!     ▼
//! 연속 거래량 증가 필터 (선택, window[0..4] 사용)
//!     │
//!     ▼
//! 안정 정렬 (동률은 원래 순서 유지)
//!     │
//!     ▼
//! 상위 limit 개
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::domain::{volume_growth_ratio, DailySnapshot, InstrumentRecord};
use crate::error::CoreError;

/// 연속 거래량 증가 판정에 필요한 거래일 수.
pub const GROWTH_WINDOW: usize = 4;

/// 기본 거래량 증가 배율 (초과해야 통과).
pub const DEFAULT_GROWTH_THRESHOLD: Decimal = dec!(1.3);

/// 기본 표시 행 수.
pub const DEFAULT_ROW_LIMIT: usize = 20;

/// 정렬 기준.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// 일일 회전율
    Turnover,
    /// 등락률
    ChangeRate,
    /// 거래량
    Volume,
    /// PER
    Per,
    /// PBR
    Pbr,
}

impl SortKey {
    fn token(&self) -> &'static str {
        match self {
            SortKey::Turnover => "turnover",
            SortKey::ChangeRate => "change_rate",
            SortKey::Volume => "volume",
            SortKey::Per => "per",
            SortKey::Pbr => "pbr",
        }
    }

    /// 레코드에서 정렬 값 추출. 값이 없으면 None.
    fn value(&self, record: &InstrumentRecord) -> Option<Decimal> {
        match self {
            SortKey::Turnover => Some(record.turnover_ratio()),
            SortKey::ChangeRate => record.change_rate,
            SortKey::Volume => Some(Decimal::from(record.trading_volume)),
            SortKey::Per => Some(record.per),
            SortKey::Pbr => Some(record.pbr),
        }
    }
}

/// 정렬 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// 정렬 기준 + 방향 (`turnover_desc`, `per_asc` 등의 토큰).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub const fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// 선택 가능한 모든 정렬 토큰.
    pub fn all() -> Vec<SortSpec> {
        let keys = [
            SortKey::Turnover,
            SortKey::ChangeRate,
            SortKey::Volume,
            SortKey::Per,
            SortKey::Pbr,
        ];
        keys.iter()
            .flat_map(|&key| {
                [
                    SortSpec::new(key, SortDirection::Desc),
                    SortSpec::new(key, SortDirection::Asc),
                ]
            })
            .collect()
    }

    /// 두 레코드 비교. 값이 없는 레코드는 방향과 무관하게 뒤로 보냅니다.
    pub fn compare(&self, a: &InstrumentRecord, b: &InstrumentRecord) -> Ordering {
        match (self.key.value(a), self.key.value(b)) {
            (Some(x), Some(y)) => match self.direction {
                SortDirection::Asc => x.cmp(&y),
                SortDirection::Desc => y.cmp(&x),
            },
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec::new(SortKey::Volume, SortDirection::Desc)
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{}_{}", self.key.token(), dir)
    }
}

impl FromStr for SortSpec {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        let (key, dir) = token
            .rsplit_once('_')
            .ok_or_else(|| CoreError::UnknownSort(s.to_string()))?;

        let direction = match dir {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Err(CoreError::UnknownSort(s.to_string())),
        };
        let key = match key {
            "turnover" => SortKey::Turnover,
            "change_rate" | "change" => SortKey::ChangeRate,
            "volume" => SortKey::Volume,
            "per" => SortKey::Per,
            "pbr" => SortKey::Pbr,
            _ => return Err(CoreError::UnknownSort(s.to_string())),
        };

        Ok(SortSpec::new(key, direction))
    }
}

impl TryFrom<String> for SortSpec {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SortSpec> for String {
    fn from(spec: SortSpec) -> Self {
        spec.to_string()
    }
}

/// 무의미한 행 제거 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroFilter {
    /// 제거하지 않음
    #[default]
    Off,
    /// PER == 0 또는 PBR == 0 행 제거
    Fundamentals,
    /// 거래량 == 0 행 제거
    Volume,
    /// 위 두 조건 모두 적용
    All,
}

impl ZeroFilter {
    /// 레코드를 유지할지 여부.
    pub fn retains(&self, record: &InstrumentRecord) -> bool {
        let fundamentals_ok = record.has_per() && record.has_pbr();
        let volume_ok = record.trading_volume > 0;
        match self {
            ZeroFilter::Off => true,
            ZeroFilter::Fundamentals => fundamentals_ok,
            ZeroFilter::Volume => volume_ok,
            ZeroFilter::All => fundamentals_ok && volume_ok,
        }
    }
}

impl FromStr for ZeroFilter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "off" | "none" => Ok(ZeroFilter::Off),
            "fundamentals" | "per_pbr" => Ok(ZeroFilter::Fundamentals),
            "volume" => Ok(ZeroFilter::Volume),
            "all" => Ok(ZeroFilter::All),
            _ => Err(CoreError::InvalidInput(format!("알 수 없는 zero filter: {}", s))),
        }
    }
}

/// N일 연속 거래량 증가 여부.
///
/// `window`는 최신순(`d0, d1, d2, d3, ...`)이며 앞의 `GROWTH_WINDOW`개만 사용합니다.
/// 종목이 한 곳이라도 없거나 거래량이 0인 날이 있으면 false.
pub fn has_consecutive_volume_growth(
    instrument_id: &str,
    window: &[&DailySnapshot],
    threshold: Decimal,
) -> bool {
    if window.len() < GROWTH_WINDOW {
        return false;
    }

    let volumes: Option<Vec<u64>> = window[..GROWTH_WINDOW]
        .iter()
        .map(|snapshot| snapshot.get(instrument_id).map(|r| r.trading_volume))
        .collect();

    let Some(volumes) = volumes else {
        return false;
    };

    volumes.windows(2).all(|pair| {
        volume_growth_ratio(pair[0], pair[1]).is_some_and(|ratio| ratio > threshold)
    })
}

/// 스크리닝 옵션.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenOptions {
    pub sort: SortSpec,
    /// 연속 거래량 증가 필터 적용 여부
    pub volume_growth: bool,
    pub growth_threshold: Decimal,
    pub limit: usize,
}

impl Default for ScreenOptions {
    fn default() -> Self {
        Self {
            sort: SortSpec::default(),
            volume_growth: false,
            growth_threshold: DEFAULT_GROWTH_THRESHOLD,
            limit: DEFAULT_ROW_LIMIT,
        }
    }
}

impl ScreenOptions {
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_volume_growth(mut self, enabled: bool) -> Self {
        self.volume_growth = enabled;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// `window[0]` 거래일의 레코드를 필터/정렬하여 상위 `limit`개 반환.
///
/// `window`는 최신순 스냅샷 목록입니다. 비어 있으면 빈 결과.
pub fn screen<'a>(window: &[&'a DailySnapshot], options: &ScreenOptions) -> Vec<&'a InstrumentRecord> {
    let Some(&current) = window.first() else {
        return Vec::new();
    };

    let rows = current.iter().filter(|r| {
        !options.volume_growth
            || has_consecutive_volume_growth(&r.instrument_id, window, options.growth_threshold)
    });

    rank(rows, options.sort, options.limit)
}

/// 레코드를 안정 정렬한 뒤 상위 `limit`개 반환.
pub fn rank<'a>(
    records: impl IntoIterator<Item = &'a InstrumentRecord>,
    sort: SortSpec,
    limit: usize,
) -> Vec<&'a InstrumentRecord> {
    let mut rows: Vec<&'a InstrumentRecord> = records.into_iter().collect();
    // slice::sort_by는 안정 정렬
    rows.sort_by(|a, b| sort.compare(a, b));
    rows.truncate(limit);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::record;
    use crate::domain::MarketSegment;
    use chrono::NaiveDate;

    fn snapshot(offset: u32, rows: Vec<InstrumentRecord>) -> DailySnapshot {
        let day = NaiveDate::from_ymd_opt(2024, 1, 10 - offset).unwrap();
        DailySnapshot::new(MarketSegment::Kospi, day, rows)
    }

    #[test]
    fn test_sort_spec_tokens() {
        for spec in SortSpec::all() {
            assert_eq!(spec.to_string().parse::<SortSpec>().unwrap(), spec);
        }
        assert_eq!(
            "change_desc".parse::<SortSpec>().unwrap(),
            SortSpec::new(SortKey::ChangeRate, SortDirection::Desc)
        );
        assert!("turnover".parse::<SortSpec>().is_err());
        assert!("name_asc".parse::<SortSpec>().is_err());
    }

    #[test]
    fn test_sort_spec_serde_as_token() {
        let spec = SortSpec::new(SortKey::Pbr, SortDirection::Asc);
        assert_eq!(serde_json::to_string(&spec).unwrap(), "\"pbr_asc\"");
        let parsed: SortSpec = serde_json::from_str("\"turnover_desc\"").unwrap();
        assert_eq!(parsed.key, SortKey::Turnover);
    }

    #[test]
    fn test_sort_turnover_desc_is_stable() {
        // a, c 회전율 동일 (10%)
        let snap = snapshot(
            0,
            vec![record("a", 10, 100), record("b", 50, 100), record("c", 20, 200)],
        );
        let options = ScreenOptions::default()
            .with_sort(SortSpec::new(SortKey::Turnover, SortDirection::Desc));

        let ids: Vec<_> = screen(&[&snap], &options)
            .iter()
            .map(|r| r.instrument_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_missing_change_rate_sorts_last() {
        let mut up = record("up", 1, 1);
        up.change_rate = Some(dec!(3.5));
        let mut down = record("down", 1, 1);
        down.change_rate = Some(dec!(-2.0));
        let none = record("none", 1, 1);
        let snap = snapshot(0, vec![none, down, up]);

        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let options = ScreenOptions::default()
                .with_sort(SortSpec::new(SortKey::ChangeRate, direction));
            let rows = screen(&[&snap], &options);
            assert_eq!(rows.last().unwrap().instrument_id, "none");
        }
    }

    #[test]
    fn test_limit_applies_after_sort() {
        let rows = (1..=30).map(|i| record(&format!("{:06}", i), i, 1_000)).collect();
        let snap = snapshot(0, rows);
        let result = screen(&[&snap], &ScreenOptions::default());

        assert_eq!(result.len(), DEFAULT_ROW_LIMIT);
        assert_eq!(result[0].trading_volume, 30);
    }

    #[test]
    fn test_zero_filter_policies() {
        let mut no_per = record("a", 10, 100);
        no_per.per = Decimal::ZERO;
        let no_volume = record("b", 0, 100);

        assert!(ZeroFilter::Off.retains(&no_per));
        assert!(!ZeroFilter::Fundamentals.retains(&no_per));
        assert!(ZeroFilter::Fundamentals.retains(&no_volume));
        assert!(!ZeroFilter::Volume.retains(&no_volume));
        assert!(!ZeroFilter::All.retains(&no_per));
        assert!(!ZeroFilter::All.retains(&no_volume));
        assert_eq!("per_pbr".parse::<ZeroFilter>().unwrap(), ZeroFilter::Fundamentals);
    }

    fn growth_window(growing: [u64; 4], flat: [u64; 4]) -> Vec<DailySnapshot> {
        (0..4)
            .map(|i| {
                snapshot(
                    i as u32,
                    vec![record("grow", growing[i], 1_000), record("flat", flat[i], 1_000)],
                )
            })
            .collect()
    }

    #[test]
    fn test_consecutive_growth_filter() {
        let days = growth_window([300, 200, 140, 100], [100, 100, 100, 100]);
        let window: Vec<&DailySnapshot> = days.iter().collect();

        assert!(has_consecutive_volume_growth("grow", &window, DEFAULT_GROWTH_THRESHOLD));
        assert!(!has_consecutive_volume_growth("flat", &window, DEFAULT_GROWTH_THRESHOLD));

        let options = ScreenOptions::default().with_volume_growth(true);
        let ids: Vec<_> = screen(&window, &options)
            .iter()
            .map(|r| r.instrument_id.as_str())
            .collect();
        assert_eq!(ids, vec!["grow"]);
    }

    #[test]
    fn test_growth_ratio_exactly_threshold_fails() {
        // 169/130 = 1.3, 130/100 = 1.3 → 경계값은 통과하지 못함
        let days = growth_window([220, 169, 130, 100], [100, 100, 100, 100]);
        let window: Vec<&DailySnapshot> = days.iter().collect();
        assert!(!has_consecutive_volume_growth("grow", &window, DEFAULT_GROWTH_THRESHOLD));

        let days = growth_window([230, 171, 131, 100], [100, 100, 100, 100]);
        let window: Vec<&DailySnapshot> = days.iter().collect();
        assert!(has_consecutive_volume_growth("grow", &window, DEFAULT_GROWTH_THRESHOLD));
    }

    #[test]
    fn test_growth_excludes_missing_or_zero() {
        let mut days = growth_window([300, 200, 140, 100], [100, 100, 100, 100]);
        days[2] = snapshot(2, vec![record("flat", 100, 1_000)]);
        let window: Vec<&DailySnapshot> = days.iter().collect();
        assert!(!has_consecutive_volume_growth("grow", &window, DEFAULT_GROWTH_THRESHOLD));

        let days = growth_window([300, 200, 140, 0], [100, 100, 100, 100]);
        let window: Vec<&DailySnapshot> = days.iter().collect();
        assert!(!has_consecutive_volume_growth("grow", &window, DEFAULT_GROWTH_THRESHOLD));

        // 3일치만 있으면 판정 불가
        assert!(!has_consecutive_volume_growth("grow", &window[..3], DEFAULT_GROWTH_THRESHOLD));
    }

    #[test]
    fn test_empty_window() {
        assert!(screen(&[], &ScreenOptions::default()).is_empty());
    }
}
