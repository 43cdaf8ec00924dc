//! 설정 관리.
//!
//! 기본값 → 설정 파일(TOML, 선택) → 환경 변수(`TURNOVER__섹션__키`) 순서로 덮어씁니다.
//!
//! ```toml
//! [cache]
//! ttl_secs = 86400
//! window_days = 4
//! segments = ["KOSPI", "KOSDAQ"]
//! zero_filter = "fundamentals"
//! ```

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::domain::MarketSegment;
use crate::screen::{SortSpec, ZeroFilter, DEFAULT_GROWTH_THRESHOLD, DEFAULT_ROW_LIMIT};

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// KRX Open API 설정
    pub krx: KrxConfig,
    /// 스냅샷 캐시 설정
    pub cache: CacheConfig,
    /// 화면 표시 설정
    pub view: ViewConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            request_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// KRX Open API 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KrxConfig {
    /// API 기본 URL
    pub base_url: String,
    /// 인증키 (없으면 `KRX_API_KEY` 환경변수 사용)
    pub auth_key: Option<String>,
    /// HTTP 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for KrxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://data-dbg.krx.co.kr".to_string(),
            auth_key: None,
            timeout_secs: 30,
        }
    }
}

impl KrxConfig {
    /// 인증키 조회 (설정 파일 우선, 환경변수 폴백).
    pub fn resolve_auth_key(&self) -> Option<String> {
        self.auth_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("KRX_API_KEY").ok())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 캐시 갱신 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// 조회 시 만료되었으면 갱신
    #[default]
    Lazy,
    /// 백그라운드 태스크가 TTL마다 갱신
    Background,
}

/// 스냅샷 캐시 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 캐시 유효 기간 (초)
    pub ttl_secs: u64,
    /// 보관할 최근 거래일 수
    pub window_days: usize,
    /// 거래일 목록 조회 시 거슬러 올라갈 달력일 수
    pub lookback_days: i64,
    /// 대상 시장
    pub segments: Vec<MarketSegment>,
    /// 무의미한 행 제거 정책
    pub zero_filter: ZeroFilter,
    /// 갱신 방식
    pub refresh_mode: RefreshMode,
    /// 시작 시 미리 적재
    pub warm_on_start: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 86_400,
            window_days: 4,
            lookback_days: 7,
            segments: MarketSegment::ALL.to_vec(),
            zero_filter: ZeroFilter::Off,
            refresh_mode: RefreshMode::Lazy,
            warm_on_start: true,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// 화면 표시 설정.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// 기본 시장
    pub default_market: MarketSegment,
    /// 기본 정렬
    pub default_sort: SortSpec,
    /// 거래일별 최대 행 수
    pub row_limit: usize,
    /// 연속 거래량 증가 배율
    pub growth_threshold: Decimal,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_market: MarketSegment::Kospi,
            default_sort: SortSpec::default(),
            row_limit: DEFAULT_ROW_LIMIT,
            growth_threshold: DEFAULT_GROWTH_THRESHOLD,
        }
    }
}

impl AppConfig {
    /// 파일(선택)과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("TURNOVER")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cache.segments")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load(DEFAULT_CONFIG_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::{SortDirection, SortKey};
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.cache.window_days, 4);
        assert_eq!(config.cache.ttl(), Duration::from_secs(86_400));
        assert_eq!(config.cache.segments, vec![MarketSegment::Kospi, MarketSegment::Kosdaq]);
        assert_eq!(config.view.row_limit, 20);
        assert_eq!(config.view.growth_threshold, dec!(1.3));
        assert_eq!(config.view.default_market, MarketSegment::Kospi);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.cache.zero_filter, ZeroFilter::Off);
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let toml = r#"
            [cache]
            ttl_secs = 60
            segments = ["KOSDAQ"]
            zero_filter = "fundamentals"
            refresh_mode = "background"

            [view]
            default_sort = "turnover_desc"
            growth_threshold = "1.5"
        "#;

        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.window_days, 4);
        assert_eq!(config.cache.segments, vec![MarketSegment::Kosdaq]);
        assert_eq!(config.cache.zero_filter, ZeroFilter::Fundamentals);
        assert_eq!(config.cache.refresh_mode, RefreshMode::Background);
        assert_eq!(
            config.view.default_sort,
            SortSpec::new(SortKey::Turnover, SortDirection::Desc)
        );
        assert_eq!(config.view.growth_threshold, dec!(1.5));
    }
}
