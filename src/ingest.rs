use chrono::{Offset, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::models::EventRecord;
use crate::timestamp::Timestamp;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed events payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("events payload has no `events` array")]
    MissingEvents,
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ParseError {
    fn field(field: &'static str, reason: impl Into<String>) -> Self {
        ParseError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Ingested {
    pub events: Vec<EventRecord>,
    /// Entries that were null, not objects, failed to decode or had no id.
    pub dropped: usize,
}

pub fn parse_events_payload(raw: &str) -> Result<Ingested, ParseError> {
    let value: Value = serde_json::from_str(raw)?;
    parse_events_value(value)
}

pub fn parse_events_value(value: Value) -> Result<Ingested, ParseError> {
    let Value::Object(mut payload) = value else {
        return Err(ParseError::MissingEvents);
    };
    let Some(Value::Array(entries)) = payload.remove("events") else {
        return Err(ParseError::MissingEvents);
    };

    let mut ingested = Ingested::default();
    for entry in entries {
        match decode_entry(entry) {
            Some(event) => ingested.events.push(event),
            None => ingested.dropped += 1,
        }
    }
    if ingested.dropped > 0 {
        tracing::warn!(
            dropped = ingested.dropped,
            kept = ingested.events.len(),
            "dropped malformed event records"
        );
    }
    Ok(ingested)
}

pub fn decode_event(raw: &str) -> Option<EventRecord> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => decode_entry(value),
        Err(err) => {
            tracing::debug!(error = %err, "stored event payload is not JSON");
            None
        }
    }
}

fn decode_entry(entry: Value) -> Option<EventRecord> {
    if !entry.is_object() {
        return None;
    }
    match serde_json::from_value::<EventRecord>(entry) {
        Ok(event) if !event.id.is_empty() => Some(event),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(error = %err, "undecodable event record");
            None
        }
    }
}

pub fn validate_new_event(event: &EventRecord) -> Result<(), ParseError> {
    if event.title.trim().is_empty() {
        return Err(ParseError::field("title", "must not be empty"));
    }

    let start = match event.start_date.as_deref() {
        Some(raw) => Timestamp::parse(raw)
            .ok_or_else(|| ParseError::field("startDate", format!("cannot parse {raw:?}")))?,
        None => return Err(ParseError::field("startDate", "is required")),
    };

    if let Some(raw) = event.end_date.as_deref() {
        let end = Timestamp::parse(raw)
            .ok_or_else(|| ParseError::field("endDate", format!("cannot parse {raw:?}")))?;
        // Zone-less values are read in the start's own offset, UTC if it has none.
        let tz = match start {
            Timestamp::Instant(instant) => *instant.offset(),
            _ => Utc.fix(),
        };
        if end.latest_in(&tz) < start.earliest_in(&tz) {
            return Err(ParseError::field("endDate", "is before startDate"));
        }
    }

    for ticket in &event.ticket_types {
        let prices = std::iter::once(ticket.price).chain(ticket.early_bird_price);
        for price in prices {
            if !price.is_finite() || price < 0.0 {
                return Err(ParseError::field("ticketTypes", format!("invalid price {price}")));
            }
        }
        if let Some(raw) = ticket.early_bird_end.as_deref() {
            if Timestamp::parse(raw).is_none() {
                return Err(ParseError::field(
                    "ticketTypes",
                    format!("cannot parse earlyBirdEnd {raw:?}"),
                ));
            }
        }
    }
    Ok(())
}
