use std::collections::HashSet;

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::models::{EventRecord, TicketType};
use crate::timestamp::Timestamp;

pub const ADDRESS_FALLBACK: &str = "Address not specified";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PriceResult {
    Free,
    Unavailable,
    /// Cheapest effective price among active ticket types. Zero is a valid
    /// amount; rendering it as "Free" is up to the display layer.
    Amount { value: f64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalBuckets {
    pub past: Vec<EventRecord>,
    pub upcoming: Vec<EventRecord>,
    /// Events with neither a parseable end nor start date.
    pub unclassifiable: Vec<EventRecord>,
}

pub fn deduplicate<I, E>(events: I) -> Vec<EventRecord>
where
    I: IntoIterator<Item = E>,
    E: Into<Option<EventRecord>>,
{
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter_map(Into::<Option<EventRecord>>::into)
        .filter(|event| !event.id.trim().is_empty())
        .filter(|event| seen.insert(event.id.clone()))
        .collect()
}

pub fn classify_temporal<I, Tz>(events: I, now: &DateTime<Tz>) -> TemporalBuckets
where
    I: IntoIterator<Item = EventRecord>,
    Tz: TimeZone,
{
    let tz = now.timezone();
    let today = now.date_naive();
    let mut buckets = TemporalBuckets::default();

    for event in events {
        match end_timestamp(&event) {
            Some(end) if end.local_date(&tz) < today => buckets.past.push(event),
            Some(_) => buckets.upcoming.push(event),
            None => buckets.unclassifiable.push(event),
        }
    }
    buckets
}

// A date-only end covers that whole day.
pub fn is_ongoing<Tz: TimeZone>(event: &EventRecord, now: &DateTime<Tz>) -> bool {
    let tz = now.timezone();
    let Some(start) = Timestamp::parse_opt(event.start_date.as_deref()) else {
        return false;
    };
    let end = Timestamp::parse_opt(event.end_date.as_deref()).unwrap_or(start);

    match (start.earliest_in(&tz), end.latest_in(&tz)) {
        (Some(start), Some(end)) => start <= *now && *now <= end,
        _ => false,
    }
}

pub fn effective_price<Tz: TimeZone>(ticket: &TicketType, now: &DateTime<Tz>) -> f64 {
    let tz = now.timezone();
    let early_bird_end = Timestamp::parse_opt(ticket.early_bird_end.as_deref())
        .and_then(|end| end.earliest_in(&tz));

    match (ticket.early_bird_price, early_bird_end) {
        (Some(early), Some(end)) if *now < end => early,
        _ => ticket.price,
    }
}

pub fn resolve_ticket_price<Tz: TimeZone>(
    ticket_types: &[TicketType],
    now: &DateTime<Tz>,
) -> PriceResult {
    if ticket_types.is_empty() {
        return PriceResult::Free;
    }

    ticket_types
        .iter()
        .filter(|ticket| ticket.is_active)
        .map(|ticket| effective_price(ticket, now))
        .reduce(f64::min)
        .map_or(PriceResult::Unavailable, |value| PriceResult::Amount { value })
}

pub fn display_address(event: &EventRecord) -> String {
    let address = non_blank(&event.address);
    let location = non_blank(&event.location);
    let city = non_blank(&event.city);
    let state = non_blank(&event.state);

    if let Some(address) = address.or(location) {
        return address.to_string();
    }
    match (city, state) {
        (Some(city), Some(state)) => format!("{city}, {state}"),
        (Some(only), None) | (None, Some(only)) => only.to_string(),
        (None, None) => ADDRESS_FALLBACK.to_string(),
    }
}

fn end_timestamp(event: &EventRecord) -> Option<Timestamp> {
    Timestamp::parse_opt(event.end_date.as_deref())
        .or_else(|| Timestamp::parse_opt(event.start_date.as_deref()))
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
