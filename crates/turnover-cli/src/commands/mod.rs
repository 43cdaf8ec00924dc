//! CLI 명령어 구현 모듈.

pub mod days;
pub mod output;
pub mod refresh;
pub mod top;
