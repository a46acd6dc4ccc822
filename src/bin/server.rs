use std::net::SocketAddr;
use std::sync::Arc;

use alert_service::api::{self, middleware::Accounts, SharedStore};
use alert_service::config::Config;
use alert_service::migrator::Migrator;
use alert_service::store::DatabaseAlertStore;
use anyhow::Context;
use axum::{http::HeaderValue, routing::get, Router};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    alert_service::telemetry::init_telemetry("alert-service", config.log_format)?;
    tracing::info!(environment = %config.environment, "Starting alert-service");

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    let db = connect(&config).await?;
    run_migrations(&config, &db).await?;

    let store = DatabaseAlertStore::new(db);
    alert_service::metrics::init_metrics(&store).await;

    let app = app(Arc::new(store), &config, prometheus_layer, metric_handle)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("listening on {}", addr);

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("Server exiting");
    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(config.db.url.clone());
    opt.max_connections(config.db.max_connections)
        .acquire_timeout(config.db.acquire_timeout)
        .sqlx_logging(false);

    Database::connect(opt)
        .await
        .context("failed to connect to database")
}

async fn run_migrations(config: &Config, db: &DatabaseConnection) -> anyhow::Result<()> {
    tracing::info!("Performing database migration...");
    match &config.db.migration_url {
        Some(url) => {
            let conn = Database::connect(url.as_str())
                .await
                .context("failed to connect with migration credentials")?;
            Migrator::up(&conn, None).await.context("failed to migrate database")?;
            conn.close().await?;
        }
        None => Migrator::up(db, None)
            .await
            .context("failed to migrate database")?,
    }
    tracing::info!("Database migration complete");
    Ok(())
}

async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Unable to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown Server...");
    shutdown.cancel();
}

fn app(
    store: SharedStore,
    config: &Config,
    prometheus_layer: axum_prometheus::PrometheusMetricLayer<'static>,
    metric_handle: metrics_exporter_prometheus::PrometheusHandle,
) -> anyhow::Result<Router> {
    let origin = config
        .cors_allowed_origin
        .parse::<HeaderValue>()
        .context("invalid CORS_ALLOWED_ORIGIN")?;

    // Dropping a timed-out handler rolls back its open transaction.
    let router = api::router(store, Accounts::new(config.users.clone()))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(prometheus_layer)
        .layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                ])
                .allow_headers(Any),
        )
        .route("/metrics", get(|| async move { metric_handle.render() }));

    Ok(router)
}
