use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_intake::config::{Config, StorageBackend};
use lead_intake::db::Database;
use lead_intake::db_storage::PgStore;
use lead_intake::dispatcher::{DispatchConfig, NotificationDispatcher, NotificationSink};
use lead_intake::handlers::AppState;
use lead_intake::models::Contacts;
use lead_intake::routes;
use lead_intake::store::{CachedCatalog, LeadStore, MemoryStore, ReviewStore, ServiceCatalog};
use lead_intake::telegram_client::TelegramClient;
use lead_intake::webhook_client::WebhookClient;

/// Resolves when the process receives Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Main entry point for the application.
///
/// Initializes logging, configuration, storage, the notification
/// dispatcher and the HTTP routes, then serves until a shutdown signal.
/// Queued notifications get a short grace period to drain on exit.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_intake=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let (leads, reviews, catalog): (
        Arc<dyn LeadStore>,
        Arc<dyn ReviewStore>,
        Arc<dyn ServiceCatalog>,
    ) = match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL required for postgres storage"))?;
            let db = Database::new(url).await?;
            tracing::info!("Database connection pool established");
            let store = Arc::new(PgStore::new(db.pool));
            let leads: Arc<dyn LeadStore> = store.clone();
            let reviews: Arc<dyn ReviewStore> = store.clone();
            let catalog: Arc<dyn ServiceCatalog> = store;
            (leads, reviews, catalog)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; submissions are lost on restart");
            let store = Arc::new(MemoryStore::new());
            let leads: Arc<dyn LeadStore> = store.clone();
            let reviews: Arc<dyn ReviewStore> = store.clone();
            let catalog: Arc<dyn ServiceCatalog> = store;
            (leads, reviews, catalog)
        }
    };

    // Published catalog changes rarely; one minute of staleness is fine
    let catalog: Arc<dyn ServiceCatalog> =
        Arc::new(CachedCatalog::new(catalog, Duration::from_secs(60)));
    tracing::info!("Service catalog cache initialized (60s TTL)");

    let notify_config = config.notify();
    let sinks: Vec<Arc<dyn NotificationSink>> = vec![
        Arc::new(TelegramClient::new(&notify_config)?),
        Arc::new(WebhookClient::new(&notify_config)?),
    ];
    let (dispatcher, worker) = NotificationDispatcher::start(
        sinks,
        DispatchConfig {
            workers: config.notify_workers,
            queue_capacity: config.notify_queue_capacity,
        },
    );
    tracing::info!(
        "Notification dispatcher started ({} workers, queue {})",
        config.notify_workers,
        config.notify_queue_capacity
    );

    let app_state = Arc::new(AppState {
        leads,
        reviews,
        catalog,
        dispatcher,
        contacts: config.contact_phone.as_deref().map(Contacts::from_phone),
    });

    // Configure rate limiter: 1 request/second per IP, burst of 5
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(1)
            .burst_size(5)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let submissions = routes::submission_routes().layer(ServiceBuilder::new().layer(GovernorLayer {
        config: governor_conf,
    }));
    let app = routes::finish(routes::public_routes().merge(submissions), app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router (and its dispatcher handle) is gone; drain what is queued
    if tokio::time::timeout(Duration::from_secs(10), worker.join())
        .await
        .is_err()
    {
        tracing::warn!("Notification queue did not drain within 10s, exiting anyway");
    }

    Ok(())
}
