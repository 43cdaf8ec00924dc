//! 일별 회전율 스냅샷 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 가장 최근 거래일 KOSPI 회전율 상위 10종목
//! turnover top -m KOSPI -s turnover_desc -n 10
//!
//! # 특정일 코스닥, 4일 연속 거래량 증가 종목만
//! turnover top -m KOSDAQ -d 2024-01-05 --growth
//!
//! # 캐시가 적재할 거래일 목록
//! turnover days
//!
//! # 전체 적재 후 시장별 건수
//! turnover refresh
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use turnover_cli::commands::output::OutputFormat;
use turnover_cli::commands::top::TopConfig;
use turnover_cli::commands::{days, refresh, top};
use turnover_core::{
    init_logging, parse_trading_date, AppConfig, LogConfig, MarketSegment, SortSpec, TradingDay,
    DEFAULT_CONFIG_PATH,
};
use turnover_data::{CacheSettings, FundamentalsFetcher, KrxApiClient, SnapshotCache, TracingHook};

#[derive(Parser)]
#[command(name = "turnover")]
#[command(about = "KRX 일별 회전율 스냅샷 CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// 로그 레벨 (설정 파일보다 우선)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 한 시장/거래일의 상위 종목 표 출력
    Top {
        /// 시장 (KOSPI, KOSDAQ)
        #[arg(short, long, default_value = "KOSPI")]
        market: String,

        /// 거래일 (YYYY-MM-DD 또는 YYYYMMDD, 기본: 가장 최근 영업일)
        #[arg(short, long)]
        day: Option<String>,

        /// 정렬 기준 (예: turnover_desc, per_asc)
        #[arg(short, long, default_value = "turnover_desc")]
        sort: String,

        /// 최대 행 수
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// 4거래일 연속 거래량 증가 종목만
        #[arg(long, default_value = "false")]
        growth: bool,

        /// 출력 형식 (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// 최근 거래일 목록 (최신순)
    Days,

    /// 설정된 모든 시장을 적재하고 시장별 건수 출력
    Refresh,
}

fn build_cache(config: &AppConfig) -> Result<SnapshotCache> {
    let client = KrxApiClient::from_config(&config.krx, Arc::new(TracingHook))
        .context("KRX API 클라이언트 생성 실패")?;
    let fetcher =
        FundamentalsFetcher::new(Arc::new(client)).with_zero_filter(config.cache.zero_filter);
    Ok(SnapshotCache::new(fetcher, CacheSettings::from(&config.cache)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("설정 로드 실패: {}", cli.config.display()))?;

    let mut log_config = LogConfig::from_settings(&config.logging);
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    let cache = build_cache(&config)?;

    match cli.command {
        Commands::Top {
            market,
            day,
            sort,
            limit,
            growth,
            format,
        } => {
            let format = OutputFormat::parse(&format)?;
            let top_config = TopConfig {
                market: market.parse::<MarketSegment>()?,
                day: match day {
                    Some(d) => TradingDay::On(parse_trading_date(&d)?),
                    None => TradingDay::MostRecent,
                },
                sort: sort.parse::<SortSpec>()?,
                limit,
                growth,
                growth_threshold: config.view.growth_threshold,
                lookback_days: config.cache.lookback_days,
            };

            let report = top::top(cache.fetcher(), &top_config).await?;
            match format {
                OutputFormat::Table => println!("{}", report.render()),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Commands::Days => {
            let days = days::days(&cache).await?;
            println!("{}", days::render(&days));
        }
        Commands::Refresh => {
            let stats = refresh::refresh(&cache).await?;
            stats.log_summary("스냅샷 적재");
            println!("{}", stats.render());
        }
    }

    info!("완료");
    Ok(())
}
