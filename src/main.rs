use std::sync::Arc;
use std::time::Duration;

mod config;
mod error;
mod functions;
mod http;
mod schema;
mod services;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Arc::new(config::Config::from_env()?);
    if config.api_token.is_none() {
        tracing::warn!("CARECALL_API_TOKEN not set, operator API is unauthenticated");
    }

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store: Arc<dyn store::Store> = Arc::new(store::PgStore::new(pool));
    let voice: Arc<dyn services::VoiceProvider> = Arc::new(services::RetellClient::new());
    let messaging: Arc<dyn services::MessageProvider> = Arc::new(services::TwilioClient::new());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let clock = tokio::spawn(functions::clock::run(
        store.clone(),
        voice.clone(),
        messaging.clone(),
        config.public_url.clone(),
        Duration::from_millis(config.clock_poll_ms),
        shutdown_rx,
    ));

    let app = http::router(http::AppState {
        store,
        voice,
        messaging,
        config: config.clone(),
    });
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = clock.await;
    Ok(())
}
