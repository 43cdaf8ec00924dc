//! 적재 통계 구조체.

use chrono::NaiveDate;
use serde::Serialize;
use std::time::Duration;
use turnover_core::MarketSegment;

/// 시장별 적재 건수.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentCount {
    pub segment: MarketSegment,
    /// 데이터가 있는 거래일 수
    pub days: usize,
    /// 전체 거래일 레코드 합계
    pub records: usize,
}

/// 캐시 적재 통계.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStats {
    /// 적재한 거래일 (최신순)
    pub days: Vec<NaiveDate>,
    pub segments: Vec<SegmentCount>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RefreshStats {
    pub fn total_records(&self) -> usize {
        self.segments.iter().map(|s| s.records).sum()
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            days = self.days.len(),
            segments = self.segments.len(),
            total_records = self.total_records(),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "적재 완료"
        );
    }

    /// 터미널 출력용 요약.
    pub fn render(&self) -> String {
        let days = self
            .days
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let mut out = format!("거래일: {}", days);
        for s in &self.segments {
            out.push_str(&format!(
                "\n{:<6}  {}일  {}건",
                s.segment.as_str(),
                s.days,
                s.records
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_summary() {
        let stats = RefreshStats {
            days: vec![
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
            ],
            segments: vec![
                SegmentCount {
                    segment: MarketSegment::Kospi,
                    days: 2,
                    records: 1900,
                },
                SegmentCount {
                    segment: MarketSegment::Kosdaq,
                    days: 2,
                    records: 3400,
                },
            ],
            elapsed: Duration::from_millis(1500),
        };

        assert_eq!(stats.total_records(), 5300);
        assert_eq!(
            stats.render(),
            "거래일: 2024-01-05, 2024-01-04\nKOSPI   2일  1900건\nKOSDAQ  2일  3400건"
        );
    }
}
