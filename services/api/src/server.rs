use crate::cli::ServeArgs;
use crate::infra::{in_memory_roster, seed_roster, AppState, DEMO_OPERATOR_EMAIL};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use fleet_roster::config::AppConfig;
use fleet_roster::error::AppError;
use fleet_roster::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let roster = in_memory_roster(&config.settings);
    if args.seed {
        seed_roster(&roster, Local::now().date_naive()).await?;
    }
    let settings = roster.settings.clone();

    let app = with_service_routes(roster)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        operator = DEMO_OPERATOR_EMAIL,
        debounce_ms = config.settings.persist_debounce.as_millis() as u64,
        "fleet roster console ready"
    );

    axum::serve(listener, app).await?;
    settings.end_session();
    Ok(())
}
