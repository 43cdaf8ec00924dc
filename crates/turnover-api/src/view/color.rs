//! 등락률 셀 배경색.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// 색 계산에 사용하는 등락률 상한 (%).
const RATE_CLAMP: Decimal = dec!(30);

/// 등락률을 배경색으로 변환합니다.
///
/// 상승은 흰색 → 연한 빨강, 하락은 흰색 → 연한 파랑으로 보간하며
/// ±30%에서 가장 진합니다. 값이 없으면 흰색.
pub fn rate_color(change_rate: Option<Decimal>) -> String {
    let Some(rate) = change_rate else {
        return "#FFFFFF".to_string();
    };

    let clamped = rate.clamp(-RATE_CLAMP, RATE_CLAMP);
    let level = shade(clamped.abs());

    if clamped >= Decimal::ZERO {
        format!("rgb(255,{level},{level})")
    } else {
        format!("rgb({level},{level},255)")
    }
}

/// 255에서 75까지 선형 감소 (소수점 버림).
fn shade(magnitude: Decimal) -> u8 {
    (dec!(255) - dec!(180) * magnitude / RATE_CLAMP)
        .trunc()
        .to_u8()
        .unwrap_or(255)
}
