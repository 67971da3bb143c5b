//! Municipal Weather Monitoring - Backend Server
//!
//! Polls Open-Meteo for every registered station, serves weather history and
//! live forecasts, and runs the citizen report and notification workflow.

use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod config;
mod error;
mod external;
mod extract;
mod handlers;
mod middleware;
mod routes;
mod scheduler;
mod services;

pub use config::Config;

use external::WeatherClient;
use scheduler::WeatherScheduler;
use services::{AuthService, WeatherService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub weather: WeatherClient,
}

impl AppState {
    pub fn weather_service(&self) -> WeatherService {
        WeatherService::new(
            self.db.clone(),
            self.weather.clone(),
            self.config.weather.clone(),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    // Initialize tracing
    let fmt_layer = if config.logging.json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wxmon_server=debug,tower_http=debug,sqlx=warn".into()),
        )
        .init();

    tracing::info!("Starting Municipal Weather Monitoring Server");
    tracing::info!("Environment: {}", config.environment);

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    if config.database.run_migrations {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;
        tracing::info!("Migrations completed");
    }

    // Bootstrap administrator
    let auth_service = AuthService::new(db_pool.clone(), &config);
    if auth_service.ensure_admin(&config.admin).await? {
        tracing::info!("Bootstrap admin account created");
    }

    // Create application state
    let state = AppState {
        db: db_pool,
        config: Arc::new(config.clone()),
        weather: WeatherClient::new(&config.weather)?,
    };

    // Start periodic ingestion
    let cancel = CancellationToken::new();
    let scheduler_handle = if config.scheduler.enabled {
        match WeatherScheduler::new(state.weather_service(), &config.scheduler) {
            Ok(scheduler) => {
                tracing::info!(
                    "Weather scheduler running every {}s",
                    scheduler.interval().as_secs()
                );
                Some(scheduler.start(cancel.clone()))
            }
            Err(err) => {
                tracing::error!("Weather scheduler not started: {err}");
                None
            }
        }
    } else {
        tracing::info!("Weather scheduler disabled");
        None
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = config.bind_address().parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await?;

    cancel.cancel();
    if let Some(handle) = scheduler_handle {
        handle.await.ok();
    }
    tracing::info!("Server stopped");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", routes::api_routes(&state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Municipal Weather Monitoring API v1"
}

/// Resolves on Ctrl-C or SIGTERM and cancels background work
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
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

    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
