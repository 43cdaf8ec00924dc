//! 스냅샷 화면 구성.
//!
//! - `model` - 캐시 데이터를 거래일별 표로 변환 (HTML/JSON 공용)
//! - `html` - Handlebars 페이지 렌더링
//! - `color` - 등락률 셀 배경색

mod color;
mod html;
mod model;

pub use color::rate_color;
pub use html::HtmlRenderer;
pub use model::{DayTable, DisplayRow, SnapshotView, ViewQuery, ViewRequest};
