//! # Spark API Server
//!
//! Entry point for the Actix-web HTTP server fronting the quota service.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

#[cfg(feature = "scheduler")]
mod background;
mod config;
mod handlers;
mod middleware;
mod observability;
mod state;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Spark API Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config).await;

    // Keep the scheduler handle alive for the life of the server.
    #[cfg(feature = "scheduler")]
    let _scheduler = start_sweep_scheduler(&config, &state).await;

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(RequestIdMiddleware)
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,api_server=debug,spark_infra=debug,spark_core=debug")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}

/// Hourly quota-record sweep. Housekeeping only; the limiter's sampled
/// inline sweep covers the same ground, and correctness depends on neither.
#[cfg(feature = "scheduler")]
async fn start_sweep_scheduler(
    config: &AppConfig,
    state: &AppState,
) -> Option<background::scheduler::Scheduler> {
    if !config.scheduler_enabled {
        tracing::info!("Scheduler disabled");
        return None;
    }

    let scheduler = match background::scheduler::Scheduler::new().await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create scheduler: {}", e);
            return None;
        }
    };

    let store = state.quota_store.clone();
    let registered = scheduler
        .add_cron("0 0 * * * *", move || {
            let store = store.clone();
            async move {
                let now_ms = chrono::Utc::now().timestamp_millis();
                match store.sweep(now_ms).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "swept expired quota records");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "scheduled quota sweep failed"),
                }
            }
        })
        .await;

    if let Err(e) = registered {
        tracing::error!("Failed to register sweep job: {}", e);
        return None;
    }

    if let Err(e) = scheduler.start().await {
        tracing::error!("Failed to start scheduler: {}", e);
        return None;
    }

    Some(scheduler)
}
