use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use chrono::Duration as ChronoDuration;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::{net::TcpListener, time::Duration};
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use jokiin_escrow::{
    config::Config,
    db::{DBClient, MarketStore, MemoryStore},
    routes::create_router,
    service::{
        background_jobs::AutoCompletionJob, notification_service::NotificationHub,
        payment_provider::HostedCheckoutGateway,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::init()?;

    let store: Arc<dyn MarketStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .map_err(|e| {
                    tracing::error!("🔥 Failed to connect to the database: {}", e);
                    e
                })?;
            tracing::info!("✅ Connection to the database is successful!");

            sqlx::migrate!("./migrations").run(&pool).await?;
            let db_client = DBClient::new(pool);
            db_client.health_check().await?;
            Arc::new(db_client)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, running on the in-memory store; nothing will persist");
            Arc::new(MemoryStore::new())
        }
    };

    let gateway = Arc::new(HostedCheckoutGateway::new(&config)?);
    let hub = Arc::new(NotificationHub::new(config.hub_channel_capacity));
    let app_state = Arc::new(AppState::new(config.clone(), store.clone(), gateway, hub.clone()));

    let auto_completion = AutoCompletionJob::new(
        store,
        app_state.escrow_service.clone(),
        Duration::from_secs(config.auto_complete_interval_secs),
        ChronoDuration::hours(config.auto_complete_grace_hours),
    )
    .start();

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_url.parse::<HeaderValue>()?)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE]);

    let app = create_router(app_state).layer(cors);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    // closing the hub ends open websocket streams so the drain can finish
    let shutdown_hub = hub.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_hub.shutdown();
        })
        .await?;

    auto_completion.stop().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
