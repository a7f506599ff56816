// apps/api/src/main.rs
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shared_config::{AppConfig, AppState};
use shared_events::EventPublisher;

mod router;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emr_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    let events = EventPublisher::connect(&config.nats_url).await;
    let state = Arc::new(AppState::new(config, events));

    let app = router::create_router(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");

    info!("EMR API listening on {:?}", listener.local_addr());

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
