use crate::error::AppError;
use crate::ingest::decode_event;
use crate::models::{Booking, EventRecord, TicketType};
use nanoid::nanoid;
use sqlx::{SqliteExecutor, SqlitePool};

// An id owned by another organizer is left untouched and affects no rows.
const UPSERT_EVENT: &str = "INSERT INTO events (id, organizer_id, payload) VALUES (?, ?, ?)
     ON CONFLICT(id) DO UPDATE SET payload = excluded.payload
     WHERE events.organizer_id = excluded.organizer_id";

pub async fn init_schema(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            organizer_id TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS interests (
            user_id TEXT NOT NULL,
            event_id TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (event_id) REFERENCES events (id) ON DELETE CASCADE,
            UNIQUE(user_id, event_id)
        );",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS bookings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            event_id TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (event_id) REFERENCES events (id) ON DELETE CASCADE
        );",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Inserts or replaces an event, assigning an id when it has none. Fails
/// when the id already belongs to another organizer.
pub async fn upsert_event(
    pool: &SqlitePool,
    organizer_id: &str,
    mut event: EventRecord,
) -> Result<EventRecord, AppError> {
    if event.id.trim().is_empty() {
        event.id = nanoid!(10);
    }
    write_event(pool, organizer_id, &event).await?;
    Ok(event)
}

pub async fn upsert_events(
    pool: &SqlitePool,
    organizer_id: &str,
    events: Vec<EventRecord>,
) -> Result<usize, AppError> {
    let mut tx = pool.begin().await?;
    let mut written = 0;
    for mut event in events {
        if event.id.trim().is_empty() {
            event.id = nanoid!(10);
        }
        write_event(&mut *tx, organizer_id, &event).await?;
        written += 1;
    }
    tx.commit().await?;
    Ok(written)
}

async fn write_event<'e, E>(executor: E, organizer_id: &str, event: &EventRecord) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    let payload = serde_json::to_string(event)?;
    let result = sqlx::query(UPSERT_EVENT)
        .bind(&event.id)
        .bind(organizer_id)
        .bind(payload)
        .execute(executor)
        .await?;
    if result.rows_affected() == 0 {
        tracing::warn!(event_id = %event.id, %organizer_id, "event id owned by another organizer");
        return Err(AppError::BadRequest(format!(
            "event {} belongs to another organizer",
            event.id
        )));
    }
    Ok(())
}

pub async fn find_event(pool: &SqlitePool, event_id: &str) -> Result<Option<EventRecord>, AppError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT payload FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|(payload,)| decode_event(&payload)))
}

/// Every event an organizer owns, oldest first. Undecodable rows come back
/// as `None`.
pub async fn events_for_organizer(
    pool: &SqlitePool,
    organizer_id: &str,
) -> Result<Vec<Option<EventRecord>>, AppError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT payload FROM events WHERE organizer_id = ? ORDER BY created_at, rowid",
    )
    .bind(organizer_id)
    .fetch_all(pool)
    .await?;
    Ok(decode_rows(rows))
}

/// Events a user is interested in followed by the events they booked. An
/// event can show up more than once.
pub async fn events_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Option<EventRecord>>, AppError> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT payload FROM (
            SELECT e.payload, 0 AS source, i.created_at AS seen_at, i.rowid AS seq
            FROM interests i JOIN events e ON e.id = i.event_id
            WHERE i.user_id = ?
            UNION ALL
            SELECT e.payload, 1 AS source, b.created_at AS seen_at, b.id AS seq
            FROM bookings b JOIN events e ON e.id = b.event_id
            WHERE b.user_id = ?
         )
         ORDER BY source, seen_at, seq",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(decode_rows(rows))
}

fn decode_rows(rows: Vec<(String,)>) -> Vec<Option<EventRecord>> {
    let records: Vec<Option<EventRecord>> = rows
        .into_iter()
        .map(|(payload,)| decode_event(&payload))
        .collect();
    let dropped = records.iter().filter(|r| r.is_none()).count();
    if dropped > 0 {
        tracing::warn!(dropped, "stored event payloads failed to decode");
    }
    records
}

pub async fn add_interest(pool: &SqlitePool, user_id: &str, event_id: &str) -> Result<(), AppError> {
    sqlx::query("INSERT OR IGNORE INTO interests (user_id, event_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn remove_interest(
    pool: &SqlitePool,
    user_id: &str,
    event_id: &str,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM interests WHERE user_id = ? AND event_id = ?")
        .bind(user_id)
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn create_booking(
    pool: &SqlitePool,
    user_id: &str,
    event_id: &str,
) -> Result<Booking, AppError> {
    let booking = sqlx::query_as(
        "INSERT INTO bookings (user_id, event_id) VALUES (?, ?) RETURNING id, user_id, event_id, created_at",
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_one(pool)
    .await?;
    Ok(booking)
}

pub async fn seed_database_if_empty(pool: &SqlitePool) -> Result<(), AppError> {
    let event_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
        .fetch_one(pool)
        .await?;
    if event_count.0 > 0 {
        return Ok(());
    }

    tracing::info!("event store is empty, seeding demo events");
    let samples = vec![
        EventRecord {
            id: "demo-expo".into(),
            title: "Regional Trade Expo".into(),
            start_date: Some("2030-04-10".into()),
            end_date: Some("2030-04-12".into()),
            ticket_types: vec![
                TicketType {
                    name: Some("Exhibitor".into()),
                    price: 250.0,
                    is_active: true,
                    ..Default::default()
                },
                TicketType {
                    name: Some("Visitor".into()),
                    price: 20.0,
                    early_bird_price: Some(12.0),
                    early_bird_end: Some("2030-03-01".into()),
                    is_active: true,
                },
            ],
            address: Some("1 Fairground Way".into()),
            ..Default::default()
        },
        EventRecord {
            id: "demo-meetup".into(),
            title: "Community Meetup".into(),
            start_date: Some("2024-02-01T18:00:00".into()),
            city: Some("Portland".into()),
            state: Some("OR".into()),
            ..Default::default()
        },
    ];
    let written = upsert_events(pool, "demo-organizer", samples).await?;
    tracing::info!(written, "seeded demo events");
    Ok(())
}
