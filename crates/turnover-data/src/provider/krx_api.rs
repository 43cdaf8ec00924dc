//! KRX Open API 클라이언트.
//!
//! 한국거래소(KRX) Open API에서 유가증권/코스닥 전종목 일별 데이터를 조회합니다.
//!
//! # 사용 API
//!
//! | 데이터 | KOSPI | KOSDAQ |
//! |--------|-------|--------|
//! | 일별 매매정보 (시가총액, 거래량, 상장주식수, 시세) | `stk_bydd_trd` | `ksq_bydd_trd` |
//! | 가치지표 (PER, PBR) | `stk_isu_per_pbr` | `ksq_isu_per_pbr` |
//! | 종목 기본정보 (종목명) | `stk_isu_base_info` | `ksq_isu_base_info` |
//!
//! 영업일 판정은 KOSPI 지수 일별 시세(`kospi_dd_trd`)가 비어 있는지로 확인합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use turnover_data::provider::KrxApiClient;
//!
//! let client = KrxApiClient::builder("YOUR_AUTH_KEY")
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let day = client.nearest_business_day().await?;
//! let rows = client.market_cap(day, MarketSegment::Kospi).await?;
//! ```

use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;
use turnover_core::{kst_today, to_base_date, KrxConfig, MarketSegment};

use super::hook::{RequestContext, RequestHook, RequestOutcome, TracingHook};
use super::{FundamentalRow, MarketCapRow, MarketDataProvider, OhlcvRow};
use crate::error::{DataError, Result};

/// KRX Open API 기본 URL.
pub const DEFAULT_BASE_URL: &str = "https://data-dbg.krx.co.kr";

/// 최근 영업일 탐색 시 거슬러 올라가는 최대 일수.
const BUSINESS_DAY_LOOKBACK: i64 = 7;

/// API 카테고리별 URL 경로.
#[derive(Debug, Clone, Copy)]
enum ApiCategory {
    /// 지수 (idx)
    Index,
    /// 주식 (sto)
    Stock,
}

impl ApiCategory {
    fn path(&self) -> &'static str {
        match self {
            ApiCategory::Index => "idx",
            ApiCategory::Stock => "sto",
        }
    }
}

/// API 응답 래퍼.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    #[serde(rename = "OutBlock_1", default)]
    out_block: Option<Vec<T>>,
}

/// 일별 매매정보 원본 행.
#[derive(Debug, Deserialize)]
struct RawDailyTrade {
    #[serde(rename = "ISU_SRT_CD", alias = "ISU_CD")]
    code: String,
    #[serde(rename = "ISU_NM", alias = "ISU_ABBRV", default)]
    name: Option<String>,
    #[serde(rename = "TDD_CLSPRC", default)]
    close: Option<String>,
    #[serde(rename = "FLUC_RT", default)]
    change_rate: Option<String>,
    #[serde(rename = "TDD_OPNPRC", default)]
    open: Option<String>,
    #[serde(rename = "TDD_HGPRC", default)]
    high: Option<String>,
    #[serde(rename = "TDD_LWPRC", default)]
    low: Option<String>,
    #[serde(rename = "ACC_TRDVOL", default)]
    volume: Option<String>,
    #[serde(rename = "ACC_TRDVAL", default)]
    trading_value: Option<String>,
    #[serde(rename = "MKTCAP", default)]
    market_cap: Option<String>,
    #[serde(rename = "LIST_SHRS", default)]
    listed_shares: Option<String>,
}

/// 가치지표 원본 행.
#[derive(Debug, Deserialize)]
struct RawValuation {
    #[serde(rename = "ISU_SRT_CD", alias = "ISU_CD")]
    code: String,
    #[serde(rename = "PER", default)]
    per: Option<String>,
    #[serde(rename = "PBR", default)]
    pbr: Option<String>,
    #[serde(rename = "DVD_YLD", default)]
    dividend_yield: Option<String>,
    #[serde(rename = "EPS", default)]
    eps: Option<String>,
    #[serde(rename = "BPS", default)]
    bps: Option<String>,
}

/// 종목 기본정보 원본 행.
#[derive(Debug, Deserialize)]
struct RawBaseInfo {
    #[serde(rename = "ISU_SRT_CD")]
    code: String,
    #[serde(rename = "ISU_ABBRV", alias = "ISU_NM")]
    name: String,
}

/// KRX Open API 클라이언트.
///
/// 종목명은 최초 조회 후 메모리에 보관합니다.
pub struct KrxApiClient {
    client: reqwest::Client,
    auth_key: SecretString,
    base_url: String,
    hook: Arc<dyn RequestHook>,
    names: RwLock<HashMap<String, String>>,
    /// 종목명 디렉터리를 마지막으로 적재한 날 (KST)
    directory_loaded_on: RwLock<Option<NaiveDate>>,
    /// 직전 매매정보 응답. 같은 (거래일, 시장)의 시세 조회에서 한 번 재사용합니다.
    last_trades: Mutex<Option<(NaiveDate, MarketSegment, Vec<RawDailyTrade>)>>,
}

impl std::fmt::Debug for KrxApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KrxApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// `KrxApiClient` 빌더.
pub struct KrxApiClientBuilder {
    auth_key: String,
    base_url: String,
    timeout: Duration,
    hook: Arc<dyn RequestHook>,
}

impl KrxApiClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 요청 훅 지정 (기본: `TracingHook`).
    pub fn hook(mut self, hook: Arc<dyn RequestHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn build(self) -> Result<KrxApiClient> {
        if self.auth_key.trim().is_empty() {
            return Err(DataError::ConfigError("KRX API 인증키가 비어 있습니다".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(KrxApiClient {
            client,
            auth_key: SecretString::new(self.auth_key.into()),
            base_url: self.base_url,
            hook: self.hook,
            names: RwLock::new(HashMap::new()),
            directory_loaded_on: RwLock::new(None),
            last_trades: Mutex::new(None),
        })
    }
}

impl KrxApiClient {
    pub fn builder(auth_key: impl Into<String>) -> KrxApiClientBuilder {
        KrxApiClientBuilder {
            auth_key: auth_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            hook: Arc::new(TracingHook),
        }
    }

    /// `[krx]` 설정 섹션에서 생성합니다.
    ///
    /// 인증키는 설정값, 없으면 환경변수 `KRX_API_KEY`를 사용합니다.
    pub fn from_config(config: &KrxConfig, hook: Arc<dyn RequestHook>) -> Result<Self> {
        let auth_key = config.resolve_auth_key().ok_or_else(|| {
            DataError::ConfigError(
                "KRX API 인증키가 없습니다 (krx.auth_key 또는 KRX_API_KEY)".to_string(),
            )
        })?;

        Self::builder(auth_key)
            .base_url(config.base_url.clone())
            .timeout(config.timeout())
            .hook(hook)
            .build()
    }

    /// API 요청 실행.
    ///
    /// AUTH_KEY는 HTTP 헤더로 전달합니다.
    async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        category: ApiCategory,
        api_id: &str,
        base_date: &str,
    ) -> Result<Vec<T>> {
        let url = format!("{}/svc/apis/{}/{}", self.base_url, category.path(), api_id);
        let ctx = RequestContext {
            api_id: api_id.to_string(),
            url: url.clone(),
            base_date: Some(base_date.to_string()),
        };

        self.hook.before_request(&ctx);
        let started = Instant::now();

        let response = match self
            .client
            .get(&url)
            .query(&[("basDd", base_date)])
            .header("AUTH_KEY", self.auth_key.expose_secret())
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.hook.after_response(
                    &ctx,
                    &RequestOutcome::TransportError {
                        message: e.to_string(),
                        elapsed: started.elapsed(),
                    },
                );
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.hook.after_response(
                &ctx,
                &RequestOutcome::HttpError {
                    status: status.as_u16(),
                    elapsed: started.elapsed(),
                },
            );
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::UpstreamUnavailable(format!(
                "KRX API 오류 [{}]: {} - {}",
                api_id, status, body
            )));
        }

        let body = response.text().await?;
        let data: ApiResponse<T> = serde_json::from_str(&body)?;
        let rows = data.out_block.unwrap_or_default();

        self.hook.after_response(
            &ctx,
            &RequestOutcome::Success {
                status: status.as_u16(),
                rows: rows.len(),
                elapsed: started.elapsed(),
            },
        );

        Ok(rows)
    }

    async fn daily_trades(&self, day: NaiveDate, segment: MarketSegment) -> Result<Vec<RawDailyTrade>> {
        let api_id = match segment {
            MarketSegment::Kospi => "stk_bydd_trd",
            MarketSegment::Kosdaq => "ksq_bydd_trd",
        };
        let rows: Vec<RawDailyTrade> = self
            .request(ApiCategory::Stock, api_id, &to_base_date(day))
            .await?;

        // 매매정보에 종목명이 있으면 이름 디렉터리를 채워 둡니다
        let named: Vec<(String, String)> = rows
            .iter()
            .filter_map(|r| r.name.as_ref().map(|n| (r.code.clone(), n.trim().to_string())))
            .filter(|(_, n)| !n.is_empty())
            .collect();
        if !named.is_empty() {
            self.names.write().await.extend(named);
        }

        Ok(rows)
    }

    /// KOSPI 지수 시세 존재 여부로 영업일을 판정합니다.
    async fn is_business_day(&self, day: NaiveDate) -> Result<bool> {
        if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            return Ok(false);
        }
        let rows: Vec<IgnoredAny> = self
            .request(ApiCategory::Index, "kospi_dd_trd", &to_base_date(day))
            .await?;
        Ok(!rows.is_empty())
    }

    /// `today`부터 거슬러 올라가며 가장 최근 영업일을 찾습니다.
    pub async fn nearest_business_day_from(&self, today: NaiveDate) -> Result<NaiveDate> {
        for offset in 0..=BUSINESS_DAY_LOOKBACK {
            let day = today - ChronoDuration::days(offset);
            if self.is_business_day(day).await? {
                return Ok(day);
            }
        }
        Err(DataError::UpstreamUnavailable(format!(
            "{} 이전 {}일 내 영업일을 찾을 수 없습니다",
            today, BUSINESS_DAY_LOOKBACK
        )))
    }

    /// 두 시장의 종목 기본정보로 이름 디렉터리를 적재합니다.
    async fn load_name_directory(&self, day: NaiveDate) -> Result<()> {
        let base_date = to_base_date(day);
        let mut loaded = HashMap::new();
        for api_id in ["stk_isu_base_info", "ksq_isu_base_info"] {
            let rows: Vec<RawBaseInfo> = self.request(ApiCategory::Stock, api_id, &base_date).await?;
            loaded.extend(rows.into_iter().map(|r| (r.code, r.name.trim().to_string())));
        }

        tracing::info!(count = loaded.len(), base_date = %base_date, "종목명 디렉터리 적재 완료");
        self.names.write().await.extend(loaded);
        Ok(())
    }
}

#[async_trait]
impl MarketDataProvider for KrxApiClient {
    async fn nearest_business_day(&self) -> Result<NaiveDate> {
        self.nearest_business_day_from(kst_today(Utc::now())).await
    }

    #[instrument(skip(self))]
    async fn business_days(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NaiveDate>> {
        let mut days = Vec::new();
        let mut day = from;
        while day <= to {
            if self.is_business_day(day).await? {
                days.push(day);
            }
            day += ChronoDuration::days(1);
        }
        Ok(days)
    }

    #[instrument(skip(self))]
    async fn market_cap(&self, day: NaiveDate, segment: MarketSegment) -> Result<Vec<MarketCapRow>> {
        let trades = self.daily_trades(day, segment).await?;
        let rows: Vec<MarketCapRow> = trades
            .iter()
            .map(|r| MarketCapRow {
                instrument_id: r.code.clone(),
                close: parse_decimal_opt(&r.close),
                market_cap: parse_decimal_opt(&r.market_cap),
                trading_volume: parse_u64_opt(&r.volume),
                trading_value: parse_decimal_opt(&r.trading_value),
                listed_shares: parse_u64_opt(&r.listed_shares),
            })
            .collect();

        *self.last_trades.lock().await = Some((day, segment, trades));

        tracing::info!(count = rows.len(), "시가총액 조회 완료");
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn fundamentals(
        &self,
        day: NaiveDate,
        segment: MarketSegment,
    ) -> Result<Vec<FundamentalRow>> {
        let api_id = match segment {
            MarketSegment::Kospi => "stk_isu_per_pbr",
            MarketSegment::Kosdaq => "ksq_isu_per_pbr",
        };
        let raw: Vec<RawValuation> = self
            .request(ApiCategory::Stock, api_id, &to_base_date(day))
            .await?;

        // 산출되지 않는 PER/PBR은 0으로 채웁니다
        let rows: Vec<FundamentalRow> = raw
            .into_iter()
            .map(|v| FundamentalRow {
                per: parse_decimal_opt(&v.per).unwrap_or(Decimal::ZERO),
                pbr: parse_decimal_opt(&v.pbr).unwrap_or(Decimal::ZERO),
                eps: parse_decimal_opt(&v.eps),
                bps: parse_decimal_opt(&v.bps),
                dividend_yield: parse_decimal_opt(&v.dividend_yield),
                instrument_id: v.code,
            })
            .collect();

        tracing::info!(count = rows.len(), "가치지표 조회 완료");
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn ohlcv(&self, day: NaiveDate, segment: MarketSegment) -> Result<Vec<OhlcvRow>> {
        let memo = self.last_trades.lock().await.take();
        let trades = match memo {
            Some((d, s, trades)) if d == day && s == segment => trades,
            _ => self.daily_trades(day, segment).await?,
        };

        let rows: Vec<OhlcvRow> = trades
            .into_iter()
            .map(|r| OhlcvRow {
                open: parse_decimal_opt(&r.open),
                high: parse_decimal_opt(&r.high),
                low: parse_decimal_opt(&r.low),
                close: parse_decimal_opt(&r.close),
                change_rate: parse_decimal_opt(&r.change_rate),
                instrument_id: r.code,
            })
            .collect();

        tracing::debug!(count = rows.len(), "일별 시세 조회 완료");
        Ok(rows)
    }

    async fn instrument_name(&self, instrument_id: &str) -> Result<String> {
        if let Some(name) = self.names.read().await.get(instrument_id) {
            return Ok(name.clone());
        }

        // 디렉터리는 하루 한 번만 적재하고, 그 안에 없는 종목은 바로 실패
        let today = kst_today(Utc::now());
        if *self.directory_loaded_on.read().await != Some(today) {
            let day = self.nearest_business_day_from(today).await?;
            self.load_name_directory(day).await?;
            *self.directory_loaded_on.write().await = Some(today);
        }

        self.names
            .read()
            .await
            .get(instrument_id)
            .cloned()
            .ok_or_else(|| DataError::UpstreamUnavailable(format!("종목명 없음: {}", instrument_id)))
    }
}

/// 문자열을 Decimal로 파싱 (쉼표, % 제거).
///
/// 빈 문자열과 "-"는 None.
fn parse_decimal_opt(s: &Option<String>) -> Option<Decimal> {
    s.as_ref().and_then(|v| {
        let cleaned = v.trim().replace(',', "").replace('%', "");
        if cleaned.is_empty() || cleaned == "-" {
            return None;
        }
        cleaned.parse().ok()
    })
}

/// 문자열을 u64로 파싱 (쉼표 제거).
fn parse_u64_opt(s: &Option<String>) -> Option<u64> {
    s.as_ref().and_then(|v| v.trim().replace(',', "").parse().ok())
}
