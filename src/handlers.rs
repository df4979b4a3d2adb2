use crate::{
    classifier::{PriceResult, deduplicate, resolve_ticket_price},
    dashboard::{DashboardView, build_dashboard, event_card},
    db,
    error::AppError,
    ingest::{parse_events_payload, validate_new_event},
    models::{Booking, EventCard, EventRecord},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Local;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRefPayload {
    event_id: String,
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    imported: usize,
    dropped: usize,
}

async fn require_event(pool: &sqlx::SqlitePool, event_id: &str) -> Result<EventRecord, AppError> {
    db::find_event(pool, event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {event_id} does not exist")))
}

pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

pub async fn create_event_handler(
    State(app_state): State<AppState>,
    Path(organizer_id): Path<String>,
    Json(payload): Json<EventRecord>,
) -> Result<(StatusCode, Json<EventRecord>), AppError> {
    validate_new_event(&payload)?;
    let event = db::upsert_event(&app_state.pool, &organizer_id, payload).await?;
    tracing::info!(event_id = %event.id, %organizer_id, "event saved");
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn import_events_handler(
    State(app_state): State<AppState>,
    Path(organizer_id): Path<String>,
    body: String,
) -> Result<Json<ImportSummary>, AppError> {
    let ingested = parse_events_payload(&body)?;
    let events = deduplicate(ingested.events);
    let imported = db::upsert_events(&app_state.pool, &organizer_id, events).await?;
    tracing::info!(%organizer_id, imported, dropped = ingested.dropped, "events imported");
    Ok(Json(ImportSummary {
        imported,
        dropped: ingested.dropped,
    }))
}

pub async fn get_event_details(
    State(app_state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<EventCard>, AppError> {
    let event = require_event(&app_state.pool, &event_id).await?;
    let now = Local::now();
    Ok(Json(event_card(&event, &now)))
}

pub async fn organizer_dashboard(
    State(app_state): State<AppState>,
    Path(organizer_id): Path<String>,
) -> Result<Json<DashboardView>, AppError> {
    let records = db::events_for_organizer(&app_state.pool, &organizer_id).await?;
    let now = Local::now();
    Ok(Json(build_dashboard(records, &now)))
}

pub async fn user_dashboard(
    State(app_state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DashboardView>, AppError> {
    let records = db::events_for_user(&app_state.pool, &user_id).await?;
    let now = Local::now();
    Ok(Json(build_dashboard(records, &now)))
}

pub async fn add_interest_handler(
    State(app_state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<EventRefPayload>,
) -> Result<StatusCode, AppError> {
    require_event(&app_state.pool, &payload.event_id).await?;
    db::add_interest(&app_state.pool, &user_id, &payload.event_id).await?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_interest_handler(
    State(app_state): State<AppState>,
    Path((user_id, event_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    db::remove_interest(&app_state.pool, &user_id, &event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_booking_handler(
    State(app_state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<EventRefPayload>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let event = require_event(&app_state.pool, &payload.event_id).await?;
    let now = Local::now();
    if matches!(
        resolve_ticket_price(&event.ticket_types, &now),
        PriceResult::Unavailable
    ) {
        return Err(AppError::BadRequest(format!(
            "event {} has no tickets on sale",
            event.id
        )));
    }
    let booking = db::create_booking(&app_state.pool, &user_id, &event.id).await?;
    tracing::info!(booking_id = booking.id, %user_id, event_id = %event.id, "booking created");
    Ok((StatusCode::CREATED, Json(booking)))
}
