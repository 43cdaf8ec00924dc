//! 한 시장/거래일의 상위 N 종목 조회.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use turnover_core::{
    screen, DailySnapshot, InstrumentRecord, MarketSegment, ScreenOptions, SortSpec, TradingDay,
    GROWTH_WINDOW,
};
use turnover_data::FundamentalsFetcher;

use super::output::render_table;

/// 상위 종목 조회 설정.
#[derive(Debug, Clone)]
pub struct TopConfig {
    pub market: MarketSegment,
    pub day: TradingDay,
    pub sort: SortSpec,
    pub limit: usize,
    /// 연속 거래량 증가 필터 적용 여부
    pub growth: bool,
    pub growth_threshold: Decimal,
    /// 이전 거래일 조회 시 거슬러 올라갈 달력일 수
    pub lookback_days: i64,
}

/// 출력 행.
#[derive(Debug, Clone, Serialize)]
pub struct TopRow {
    pub rank: usize,
    pub instrument_id: String,
    pub name: String,
    pub trading_volume: u64,
    pub turnover_ratio: Decimal,
    pub change_rate: Option<Decimal>,
    pub close_price: Option<Decimal>,
    pub per: Decimal,
    pub pbr: Decimal,
}

impl TopRow {
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
        }
    }
}

/// 조회 결과.
#[derive(Debug, Clone, Serialize)]
pub struct TopReport {
    pub market: MarketSegment,
    pub day: NaiveDate,
    pub sort: SortSpec,
    pub rows: Vec<TopRow>,
}

impl TopReport {
    /// 터미널 표 형식.
    pub fn render(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.rank.to_string(),
                    r.instrument_id.clone(),
                    r.name.clone(),
                    r.trading_volume.to_string(),
                    format!("{:.2}", r.turnover_ratio),
                    r.change_rate
                        .map(|c| format!("{:+.2}", c))
                        .unwrap_or_else(|| "-".to_string()),
                    r.close_price
                        .map(|p| p.trunc().to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    format!("{:.2}", r.per),
                    format!("{:.2}", r.pbr),
                ]
            })
            .collect();

        let title = format!(
            "{} {} ({}, {}개)",
            self.market,
            self.day.format("%Y-%m-%d"),
            self.sort,
            self.rows.len()
        );
        let table = render_table(
            &["#", "코드", "종목명", "거래량", "회전율(%)", "등락률(%)", "종가", "PER", "PBR"],
            &rows,
        );
        format!("{}\n{}", title, table)
    }
}

/// 상위 종목 조회.
///
/// 거래량 증가 필터를 켜면 기준일 포함 최근 `GROWTH_WINDOW` 거래일을 함께 가져옵니다.
pub async fn top(fetcher: &FundamentalsFetcher, config: &TopConfig) -> Result<TopReport> {
    let day = fetcher
        .resolve_day(config.day)
        .await
        .context("기준 거래일 확인 실패")?;

    let days = if config.growth {
        window_days(fetcher, day, config.lookback_days).await?
    } else {
        vec![day]
    };

    let mut snapshots: Vec<DailySnapshot> = Vec::with_capacity(days.len());
    for d in &days {
        let snapshot = fetcher
            .fetch(TradingDay::On(*d), config.market)
            .await
            .with_context(|| format!("{} {} 스냅샷 조회 실패", config.market, d))?;
        snapshots.push(snapshot);
    }

    let window: Vec<&DailySnapshot> = snapshots.iter().collect();
    let options = ScreenOptions {
        sort: config.sort,
        volume_growth: config.growth,
        growth_threshold: config.growth_threshold,
        limit: config.limit,
    };

    let rows: Vec<TopRow> = screen(&window, &options)
        .into_iter()
        .enumerate()
        .map(|(i, record)| TopRow::from_record(i + 1, record))
        .collect();

    info!(market = %config.market, %day, rows = rows.len(), "상위 종목 조회 완료");

    Ok(TopReport {
        market: config.market,
        day,
        sort: config.sort,
        rows,
    })
}

/// `day` 포함 최근 영업일 (최신순, 최대 `GROWTH_WINDOW`개).
async fn window_days(
    fetcher: &FundamentalsFetcher,
    day: NaiveDate,
    lookback_days: i64,
) -> Result<Vec<NaiveDate>> {
    let from = day - Duration::days(lookback_days);
    let mut days = fetcher
        .provider()
        .business_days(from, day)
        .await
        .context("영업일 목록 조회 실패")?;

    days.retain(|d| *d < day);
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.truncate(GROWTH_WINDOW - 1);
    days.insert(0, day);
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use turnover_core::{SortDirection, SortKey};
    use turnover_data::FixtureProvider;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn config() -> TopConfig {
        TopConfig {
            market: MarketSegment::Kospi,
            day: TradingDay::MostRecent,
            sort: SortSpec::new(SortKey::Turnover, SortDirection::Desc),
            limit: 10,
            growth: false,
            growth_threshold: dec!(1.3),
            lookback_days: 7,
        }
    }

    /// 1/2 ~ 1/5, "grow"는 매일 1.5배, "flat"은 일정
    fn fetcher() -> FundamentalsFetcher {
        let provider = Arc::new(FixtureProvider::new());
        for (d, grow) in [(2, 100), (3, 150), (4, 225), (5, 338)] {
            provider.add_instrument(day(d), MarketSegment::Kospi, "flat", "보합", 400, 1000, dec!(10), dec!(1));
            provider.add_instrument(day(d), MarketSegment::Kospi, "grow", "증가", grow, 1000, dec!(20), dec!(2));
        }
        FundamentalsFetcher::new(provider)
    }

    #[tokio::test]
    async fn test_top_most_recent_by_turnover() {
        let report = top(&fetcher(), &config()).await.unwrap();

        assert_eq!(report.day, day(5));
        let ids: Vec<_> = report.rows.iter().map(|r| r.instrument_id.as_str()).collect();
        assert_eq!(ids, vec!["flat", "grow"]);
        assert_eq!(report.rows[0].turnover_ratio, dec!(40));
        assert_eq!(report.rows[1].rank, 2);
    }

    #[tokio::test]
    async fn test_top_explicit_day_and_limit() {
        let config = TopConfig {
            day: TradingDay::On(day(3)),
            sort: SortSpec::new(SortKey::Volume, SortDirection::Asc),
            limit: 1,
            ..config()
        };
        let report = top(&fetcher(), &config).await.unwrap();

        assert_eq!(report.day, day(3));
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].instrument_id, "grow");
        assert_eq!(report.rows[0].trading_volume, 150);
    }

    #[tokio::test]
    async fn test_top_growth_filter_uses_previous_days() {
        let config = TopConfig {
            growth: true,
            ..config()
        };
        let report = top(&fetcher(), &config).await.unwrap();

        let ids: Vec<_> = report.rows.iter().map(|r| r.instrument_id.as_str()).collect();
        assert_eq!(ids, vec!["grow"]);
    }

    #[tokio::test]
    async fn test_top_growth_needs_four_days() {
        let config = TopConfig {
            day: TradingDay::On(day(3)),
            growth: true,
            ..config()
        };
        let report = top(&fetcher(), &config).await.unwrap();

        assert!(report.rows.is_empty());
    }

    #[tokio::test]
    async fn test_top_unknown_day_fails() {
        let config = TopConfig {
            day: TradingDay::On(day(9)),
            ..config()
        };
        assert!(top(&fetcher(), &config).await.is_err());
    }

    #[test]
    fn test_render_report() {
        let report = TopReport {
            market: MarketSegment::Kosdaq,
            day: day(5),
            sort: SortSpec::default(),
            rows: vec![TopRow {
                rank: 1,
                instrument_id: "035720".to_string(),
                name: "카카오".to_string(),
                trading_volume: 1234,
                turnover_ratio: dec!(1.5),
                change_rate: Some(dec!(-2.1)),
                close_price: None,
                per: dec!(0),
                pbr: dec!(1.25),
            }],
        };

        let text = report.render();
        assert!(text.starts_with("KOSDAQ 2024-01-05 (volume_desc, 1개)"));
        assert!(text.contains("카카오"));
        assert!(text.contains("1.50"));
        assert!(text.contains("-2.10"));
    }
}
