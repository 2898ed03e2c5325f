//! API server entry point.

use std::sync::Arc;

use api::AppState;
use api::config::Config;
use gateway::{CheckoutUrls, GatewayConfig, NvpClient};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{CheckoutStore, InMemoryCheckoutStore, PostgresCheckoutStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Builds the router over `store` and serves it until shutdown.
async fn serve<S: CheckoutStore + 'static>(
    config: &Config,
    gateway_config: GatewayConfig,
    client: NvpClient,
    store: S,
    urls: CheckoutUrls,
    metrics_handle: PrometheusHandle,
) {
    let state = Arc::new(AppState::new(
        gateway_config,
        client,
        store,
        urls,
        config.payment_method_id,
    ));
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    // 1. Load server configuration
    let config = Config::from_env().expect("invalid server configuration");

    // 2. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 3. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 4. Load gateway credentials and build the provider client
    let gateway_config = GatewayConfig::from_env(config.business_entity.clone())
        .expect("invalid gateway configuration");
    tracing::info!(
        business_entity = %config.business_entity,
        mode = ?gateway_config.mode,
        auto_capture = gateway_config.auto_capture(),
        "gateway configured"
    );
    let client = NvpClient::new(&gateway_config).expect("failed to build provider client");
    let urls = config.checkout_urls().expect("invalid PUBLIC_URL");

    // 5. Pick the store and serve
    match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url)
                .await
                .expect("failed to connect to database");
            let store = PostgresCheckoutStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL checkout store");
            serve(&config, gateway_config, client, store, urls, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, checkout records are kept in memory");
            let store = InMemoryCheckoutStore::new();
            serve(&config, gateway_config, client, store, urls, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
