//! 회전율 및 거래량 증가율 계산.
//!
//! 0으로 나누는 경우는 에러가 아니라 정의된 값(0 또는 None)으로 처리합니다.

use rust_decimal::Decimal;

/// 일일 회전율 (%) = 거래량 / 상장주식수 * 100.
///
/// 상장주식수가 0이면 0을 반환합니다.
pub fn turnover_ratio(trading_volume: u64, listed_shares: u64) -> Decimal {
    if listed_shares == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(trading_volume) / Decimal::from(listed_shares) * Decimal::ONE_HUNDRED
}

/// 전일 대비 거래량 배율 (newer / older).
///
/// 어느 한쪽이라도 거래량이 0이면 None.
pub fn volume_growth_ratio(newer: u64, older: u64) -> Option<Decimal> {
    if newer == 0 || older == 0 {
        return None;
    }
    Some(Decimal::from(newer) / Decimal::from(older))
}
