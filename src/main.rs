use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::info;

use storefront_api::auth::TokenVerifier;
use storefront_api::config::{init_tracing, load_config};
use storefront_api::db::{establish_connection, run_migrations};
use storefront_api::events::{process_events, EventSender};
use storefront_api::payments::{RazorpayGateway, SignatureVerifier};
use storefront_api::services::AppServices;
use storefront_api::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(config.log_level(), config.log_json);

    info!(
        environment = %config.environment,
        "Starting storefront API"
    );

    let db = Arc::new(
        establish_connection(&config)
            .await
            .context("failed to connect to database")?,
    );

    if config.auto_migrate {
        run_migrations(&db)
            .await
            .context("failed to run database migrations")?;
    }

    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = EventSender::new(event_tx);
    tokio::spawn(process_events(event_rx));

    let gateway = Arc::new(RazorpayGateway::new(&config).context("failed to build gateway client")?);
    let verifier = SignatureVerifier::new(config.razorpay_key_secret.clone());
    let token_verifier = TokenVerifier::from_config(&config);

    let services = AppServices::new(
        db.clone(),
        event_sender,
        gateway,
        verifier,
        config.currency.clone(),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid host/port configuration")?;

    let state = AppState {
        db,
        config: Arc::new(config),
        services,
        token_verifier,
    };
    let app = app_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
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
        _ = ctrl_c => info!("Received ctrl-c, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
