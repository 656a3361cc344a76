use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use salonbook::config::AppConfig;
use salonbook::db;
use salonbook::handlers;
use salonbook::services::messaging::twilio::TwilioSmsProvider;
use salonbook::services::messaging::{LogOnlyMessaging, MessagingProvider};
use salonbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let messaging: Arc<dyn MessagingProvider> = match TwilioSmsProvider::from_config(&config) {
        Some(twilio) => {
            tracing::info!("customer SMS via Twilio");
            Arc::new(twilio)
        }
        None => {
            tracing::warn!("Twilio credentials missing, customer SMS will only be logged");
            Arc::new(LogOnlyMessaging)
        }
    };

    tracing::info!(
        policy = ?config.conflict_check_policy,
        capacity = config.event_channel_capacity,
        "lifecycle engine configured"
    );

    let state = Arc::new(AppState::new(conn, config.clone(), messaging));
    state.spawn_subscribers();

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
