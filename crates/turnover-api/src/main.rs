//! 일별 회전율 스냅샷 웹 서버.
//!
//! KRX Open API에서 최근 거래일 스냅샷을 가져와 캐시하고,
//! 거래일별 표 페이지와 JSON API를 제공합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use turnover_api::metrics::setup_metrics_recorder;
use turnover_api::middleware::metrics_layer;
use turnover_api::routes::create_router;
use turnover_api::state::AppState;
use turnover_api::view::HtmlRenderer;
use turnover_core::{init_logging, AppConfig, LogConfig, RefreshMode, ServerConfig};
use turnover_data::{CacheSettings, FundamentalsFetcher, KrxApiClient, SnapshotCache, TracingHook};

/// CORS 레이어 생성.
///
/// CORS_ORIGINS 환경변수가 설정되어 있으면 해당 origin만 허용합니다.
/// 설정되지 않으면 모든 origin을 허용합니다. 조회 전용이므로 GET만 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([axum::http::Method::GET, axum::http::Method::OPTIONS])
        .allow_headers([axum::http::header::ACCEPT, axum::http::header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
fn build_app(
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
    server: &ServerConfig,
) -> Router {
    let mut app = create_router().with_state(state);

    if let Some(handle) = metrics_handle {
        let metrics_router = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(handle);
        app = app.merge(metrics_router);
    }

    app.layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            server.request_timeout(),
        ))
        .layer(cors_layer())
}

fn socket_addr(server: &ServerConfig) -> anyhow::Result<SocketAddr> {
    format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| {
            format!(
                "소켓 주소 설정이 유효하지 않습니다: {}:{} (server.host, server.port 확인)",
                server.host, server.port
            )
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("설정 로드 실패")?;

    init_logging(LogConfig::from_settings(&config.logging))
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    info!("Starting turnover snapshot server...");

    // Prometheus 메트릭 레코더 설정 (실패해도 서버는 계속)
    let metrics_handle = match setup_metrics_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics recorder initialized");
            Some(handle)
        }
        Err(e) => {
            warn!(error = %e, "Prometheus metrics recorder unavailable");
            None
        }
    };

    let addr = socket_addr(&config.server).inspect_err(|e| error!(error = %e, "서버 주소 오류"))?;

    // KRX 클라이언트 → 수집기 → 캐시
    let client = KrxApiClient::from_config(&config.krx, Arc::new(TracingHook))
        .context("KRX API 클라이언트 생성 실패")?;
    let fetcher =
        FundamentalsFetcher::new(Arc::new(client)).with_zero_filter(config.cache.zero_filter);
    let cache = Arc::new(SnapshotCache::new(
        fetcher,
        CacheSettings::from(&config.cache),
    ));

    info!(
        ttl_secs = config.cache.ttl_secs,
        window_days = config.cache.window_days,
        segments = ?config.cache.segments,
        zero_filter = ?config.cache.zero_filter,
        refresh_mode = ?config.cache.refresh_mode,
        "Snapshot cache configured"
    );

    let shutdown_token = CancellationToken::new();

    if config.cache.warm_on_start {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache.warm().await;
        });
    }

    let refresher = match config.cache.refresh_mode {
        RefreshMode::Background => {
            info!("백그라운드 캐시 갱신 시작");
            Some(cache.spawn_refresher(config.cache.ttl(), shutdown_token.clone()))
        }
        RefreshMode::Lazy => None,
    };

    let renderer = HtmlRenderer::new().context("템플릿 등록 실패")?;
    let state = Arc::new(AppState::new(cache, config.view.clone(), renderer));
    info!(version = %state.version, "Application state initialized");

    let app = build_app(state, metrics_handle, &config.server);

    info!(%addr, "Server listening");
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("{} 바인딩 실패", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone()))
        .await?;

    info!("Server shutdown initiated, cleaning up...");
    shutdown_token.cancel();

    if let Some(handle) = refresher {
        if tokio::time::timeout(Duration::from_secs(10), handle).await.is_err() {
            warn!("Cleanup timeout, forcing shutdown");
        }
    }

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
/// 시그널 핸들러 설치에 실패하면 해당 시그널은 기다리지 않습니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}
