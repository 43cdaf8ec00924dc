//! 일별 시장 스냅샷을 위한 도메인 모델.

mod calculations;
mod market;
mod record;

#[cfg(test)]
pub(crate) use record::test_support;

pub use calculations::*;
pub use market::*;
pub use record::*;
