//! Event dashboards for attendees and organizers.
//!
//! The interesting part is [`classifier`]: deduplication, past/upcoming
//! bucketing and ticket price resolution over loosely-typed event records.
//! The rest is the sqlx-backed store and the axum routes that feed it.

pub mod classifier;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod state;
pub mod timestamp;

use axum::{
    Router,
    routing::{delete, get, post},
};
use state::AppState;
use tower_http::trace::TraceLayer;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/events/{event_id}", get(handlers::get_event_details))
        .route(
            "/api/organizers/{organizer_id}/events",
            post(handlers::create_event_handler),
        )
        .route(
            "/api/organizers/{organizer_id}/events/import",
            post(handlers::import_events_handler),
        )
        .route(
            "/api/organizers/{organizer_id}/dashboard",
            get(handlers::organizer_dashboard),
        )
        .route(
            "/api/users/{user_id}/interests",
            post(handlers::add_interest_handler),
        )
        .route(
            "/api/users/{user_id}/interests/{event_id}",
            delete(handlers::remove_interest_handler),
        )
        .route(
            "/api/users/{user_id}/bookings",
            post(handlers::create_booking_handler),
        )
        .route("/api/users/{user_id}/dashboard", get(handlers::user_dashboard))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
