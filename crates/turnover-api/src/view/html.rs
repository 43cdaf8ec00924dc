//! HTML 페이지 렌더링.
//!
//! 템플릿은 바이너리에 포함되며 Handlebars로 렌더링합니다.
//! 숫자 서식과 셀 색상은 렌더링 전에 모두 문자열로 계산합니다.

use handlebars::{Handlebars, RenderError, TemplateError};
use rust_decimal::Decimal;
use serde::Serialize;
use turnover_core::{MarketSegment, SortDirection, SortKey, SortSpec};

use super::model::{DayTable, DisplayRow, SnapshotView};

const SNAPSHOT_TEMPLATE: &str = "snapshot";
const UNAVAILABLE_TEMPLATE: &str = "unavailable";

/// 스냅샷 페이지 렌더러.
#[derive(Debug)]
pub struct HtmlRenderer {
    registry: Handlebars<'static>,
}

impl HtmlRenderer {
    /// 내장 템플릿을 등록합니다.
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_template_string(
            SNAPSHOT_TEMPLATE,
            include_str!("../../templates/snapshot.hbs"),
        )?;
        registry.register_template_string(
            UNAVAILABLE_TEMPLATE,
            include_str!("../../templates/unavailable.hbs"),
        )?;

        Ok(Self { registry })
    }

    /// 거래일별 표 페이지.
    pub fn render_snapshot(&self, view: &SnapshotView) -> Result<String, RenderError> {
        let page = SnapshotPage::from_view(view);
        self.registry.render(SNAPSHOT_TEMPLATE, &page)
    }

    /// 데이터를 가져오지 못했을 때의 안내 페이지.
    pub fn render_unavailable(
        &self,
        market: MarketSegment,
        message: &str,
    ) -> Result<String, RenderError> {
        let page = UnavailablePage {
            markets: market_options(market),
            message: message.to_string(),
        };
        self.registry.render(UNAVAILABLE_TEMPLATE, &page)
    }
}

#[derive(Debug, Serialize)]
struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

#[derive(Debug, Serialize)]
struct SnapshotPage {
    market: String,
    markets: Vec<SelectOption>,
    sorts: Vec<SelectOption>,
    growth: bool,
    refreshed_at: String,
    days: Vec<DayPage>,
}

#[derive(Debug, Serialize)]
struct DayPage {
    date: String,
    has_data: bool,
    show_change_rate: bool,
    show_close_price: bool,
    rows: Vec<RowPage>,
}

#[derive(Debug, Serialize)]
struct RowPage {
    rank: usize,
    instrument_id: String,
    name: String,
    trading_volume: String,
    turnover_ratio: String,
    change_rate: String,
    close_price: String,
    per: String,
    pbr: String,
    rate_color: String,
}

#[derive(Debug, Serialize)]
struct UnavailablePage {
    markets: Vec<SelectOption>,
    message: String,
}

impl SnapshotPage {
    fn from_view(view: &SnapshotView) -> Self {
        Self {
            market: view.market.to_string(),
            markets: market_options(view.market),
            sorts: sort_options(view.sort),
            growth: view.growth,
            refreshed_at: view
                .refreshed_at
                .with_timezone(&chrono_tz::Asia::Seoul)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            days: view.days.iter().map(DayPage::from_table).collect(),
        }
    }
}

impl DayPage {
    fn from_table(table: &DayTable) -> Self {
        Self {
            date: table.date.clone(),
            has_data: table.has_data,
            show_change_rate: table.show_change_rate,
            show_close_price: table.show_close_price,
            rows: table.rows.iter().map(RowPage::from_row).collect(),
        }
    }
}

impl RowPage {
    fn from_row(row: &DisplayRow) -> Self {
        Self {
            rank: row.rank,
            instrument_id: row.instrument_id.clone(),
            name: row.name.clone(),
            trading_volume: group_digits(&row.trading_volume.to_string()),
            turnover_ratio: format!("{:.2}", row.turnover_ratio),
            change_rate: row
                .change_rate
                .map(|r| format!("{:+.2}", r))
                .unwrap_or_else(|| "-".to_string()),
            close_price: row
                .close_price
                .map(|p| group_digits(&p.trunc().to_string()))
                .unwrap_or_else(|| "-".to_string()),
            per: format_ratio(row.per),
            pbr: format_ratio(row.pbr),
            rate_color: row.rate_color.clone(),
        }
    }
}

fn market_options(current: MarketSegment) -> Vec<SelectOption> {
    MarketSegment::ALL
        .iter()
        .map(|m| SelectOption {
            value: m.as_str().to_string(),
            label: m.as_str().to_string(),
            selected: *m == current,
        })
        .collect()
}

fn sort_options(current: SortSpec) -> Vec<SelectOption> {
    SortSpec::all()
        .into_iter()
        .map(|spec| SelectOption {
            value: spec.to_string(),
            label: sort_label(spec),
            selected: spec == current,
        })
        .collect()
}

fn sort_label(spec: SortSpec) -> String {
    let key = match spec.key {
        SortKey::Turnover => "회전율",
        SortKey::ChangeRate => "등락률",
        SortKey::Volume => "거래량",
        SortKey::Per => "PER",
        SortKey::Pbr => "PBR",
    };
    let direction = match spec.direction {
        SortDirection::Desc => "내림차순",
        SortDirection::Asc => "오름차순",
    };
    format!("{} {}", key, direction)
}

/// PER/PBR 표시. 0은 값 없음으로 표시합니다.
fn format_ratio(value: Decimal) -> String {
    if value.is_zero() {
        "-".to_string()
    } else {
        format!("{:.2}", value)
    }
}

/// 정수 문자열에 천 단위 구분 기호를 넣습니다 (`1234567` → `1,234,567`).
fn group_digits(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{}{}", sign, out)
}
