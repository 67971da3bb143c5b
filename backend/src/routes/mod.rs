//! Route definitions for the Municipal Weather Monitoring service

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes - user profiles
        .nest("/users", user_routes(state))
        // Protected routes - citizen reports
        .nest("/reports", report_routes(state))
        // Protected routes - notifications
        .nest("/notifications", notification_routes(state))
        // Protected routes - stations, ingestion and forecasts
        .nest("/weather", weather_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
}

/// User routes (protected; list/detail/update of others are admin-only)
fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::users::list_users))
        .route(
            "/me",
            get(handlers::users::get_me).put(handlers::users::update_me),
        )
        .route(
            "/:user_id",
            get(handlers::users::get_user).put(handlers::users::update_user),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Report routes (protected)
fn report_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::reports::list_reports).post(handlers::reports::create_report),
        )
        .route("/mine", get(handlers::reports::my_reports))
        .route("/:report_id", put(handlers::reports::update_report))
        .route("/:report_id/status", patch(handlers::reports::update_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Notification routes (protected)
fn notification_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::notifications::list_notifications)
                .delete(handlers::notifications::clear_all),
        )
        .route("/unread-count", get(handlers::notifications::unread_count))
        .route("/mark-all-read", post(handlers::notifications::mark_all_read))
        .route("/:notification_id/read", patch(handlers::notifications::mark_read))
        .route(
            "/:notification_id",
            delete(handlers::notifications::delete_notification),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Weather routes (protected)
fn weather_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/stations",
            get(handlers::stations::list_stations).post(handlers::stations::create_station),
        )
        .route(
            "/stations/:station_id",
            get(handlers::stations::get_station)
                .put(handlers::stations::update_station)
                .delete(handlers::stations::delete_station),
        )
        .route(
            "/stations/:station_id/readings",
            get(handlers::stations::station_readings),
        )
        .route("/fetch", post(handlers::weather::fetch_weather))
        .route("/history", get(handlers::weather::history))
        .route("/forecast", get(handlers::weather::forecast))
        .route("/live", get(handlers::weather::live))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}
