//! lootwheel-engine server entry point.
//!
//! Starts the Axum HTTP server with the order, spin, and webhook endpoints.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use lootwheel_engine::api;
use lootwheel_engine::app_state::AppState;
use lootwheel_engine::config::EngineConfig;
use lootwheel_engine::domain::{Catalog, EventBus, IntentStore};
use lootwheel_engine::gateway::{HttpPaymentGateway, WebhookVerifier};
use lootwheel_engine::persistence::postgres::PostgresPersistence;
use lootwheel_engine::service::{ReconciliationEngine, RewardAllocator, SpinLedger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = EngineConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting lootwheel-engine");

    // Build domain layer
    let intents = Arc::new(IntentStore::new());
    let catalog = Arc::new(Catalog::new());
    let event_bus = EventBus::new(config.event_bus_capacity);

    // Wire persistence: load the catalog and start the event-log writer.
    if config.persistence_enabled {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await?;
        let persistence = PostgresPersistence::new(pool);

        for row in persistence.load_contests().await? {
            match row.into_contest() {
                Ok(contest) => catalog.insert_contest(contest).await,
                Err(e) => tracing::warn!(error = %e, "skipping malformed contest row"),
            }
        }
        for row in persistence.load_inventory().await? {
            catalog.insert_item(row.into_item()).await;
        }
        tracing::info!(
            contests = catalog.contest_count().await,
            items = catalog.item_count().await,
            "catalog loaded"
        );

        if config.event_log_enabled {
            let mut rx = event_bus.subscribe();
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(event) => {
                            let Ok(payload) = serde_json::to_value(&event) else {
                                continue;
                            };
                            if let Err(e) = persistence
                                .save_event(
                                    *event.intent_id().as_uuid(),
                                    event.event_type_str(),
                                    &payload,
                                )
                                .await
                            {
                                tracing::warn!(error = %e, "event log append failed");
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event log writer lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            });
        }
    }

    // Build gateway adapter
    let gateway = Arc::new(HttpPaymentGateway::new(
        config.gateway_base_url.clone(),
        config.gateway_api_key.clone(),
        config.gateway_api_secret.clone(),
        config.gateway_timeout_secs,
    )?);
    let verifier = WebhookVerifier::new(
        config.webhook_secret.clone(),
        config.webhook_tolerance_secs,
    );

    // Build service layer
    let reconciliation = Arc::new(ReconciliationEngine::new(
        Arc::clone(&intents),
        Arc::clone(&catalog),
        gateway,
        verifier,
        event_bus.clone(),
        config.order_expiry_secs,
    ));
    let spin_ledger = Arc::new(SpinLedger::new(
        Arc::clone(&intents),
        Arc::clone(&catalog),
        event_bus.clone(),
    ));
    let allocator = Arc::new(RewardAllocator::new(
        intents,
        catalog,
        event_bus.clone(),
        config.rarity_weight_decay,
    ));

    // Build application state
    let app_state = AppState {
        reconciliation,
        spin_ledger,
        allocator,
        event_bus,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
