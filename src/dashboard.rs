use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::Serialize;

use crate::classifier::{
    classify_temporal, deduplicate, display_address, is_ongoing, resolve_ticket_price,
};
use crate::models::{EventCard, EventRecord};
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// Soonest first.
    pub upcoming: Vec<EventCard>,
    /// Most recently finished first.
    pub past: Vec<EventCard>,
    /// How many upcoming events are in progress right now.
    pub ongoing: usize,
    /// Events left out because they carry no usable date.
    pub unclassified: usize,
}

pub fn event_card<Tz: TimeZone>(event: &EventRecord, now: &DateTime<Tz>) -> EventCard {
    EventCard {
        id: event.id.clone(),
        title: event.title.clone(),
        start_date: event.start_date.clone(),
        end_date: event.end_date.clone(),
        price: resolve_ticket_price(&event.ticket_types, now),
        address: display_address(event),
        ongoing: is_ongoing(event, now),
    }
}

pub fn build_dashboard<I, E, Tz>(records: I, now: &DateTime<Tz>) -> DashboardView
where
    I: IntoIterator<Item = E>,
    E: Into<Option<EventRecord>>,
    Tz: TimeZone,
{
    let tz = now.timezone();
    let mut buckets = classify_temporal(deduplicate(records), now);

    // Stable sorts; records without a usable date keep their relative order.
    buckets
        .upcoming
        .sort_by_key(|event| sort_date(event.start_date.as_deref(), &tz).unwrap_or(NaiveDate::MAX));
    buckets.past.sort_by_key(|event| {
        Reverse(
            sort_date(event.end_date.as_deref(), &tz)
                .or_else(|| sort_date(event.start_date.as_deref(), &tz)),
        )
    });

    let upcoming: Vec<EventCard> = buckets
        .upcoming
        .iter()
        .map(|event| event_card(event, now))
        .collect();
    let past = buckets
        .past
        .iter()
        .map(|event| event_card(event, now))
        .collect();

    if !buckets.unclassifiable.is_empty() {
        tracing::debug!(
            count = buckets.unclassifiable.len(),
            "events without a usable date left off the dashboard"
        );
    }

    DashboardView {
        ongoing: upcoming.iter().filter(|card| card.ongoing).count(),
        upcoming,
        past,
        unclassified: buckets.unclassifiable.len(),
    }
}

fn sort_date<Tz: TimeZone>(raw: Option<&str>, tz: &Tz) -> Option<NaiveDate> {
    Timestamp::parse_opt(raw).map(|ts| ts.local_date(tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::PriceResult;
    use crate::models::TicketType;
    use chrono::Utc;

    fn record(id: &str, start: Option<&str>, end: Option<&str>) -> EventRecord {
        EventRecord {
            id: id.into(),
            title: id.to_uppercase(),
            start_date: start.map(Into::into),
            end_date: end.map(Into::into),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn ids(cards: &[EventCard]) -> Vec<&str> {
        cards.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn sorts_and_counts() {
        let records = vec![
            Some(record("later", Some("2025-09-01"), None)),
            Some(record("old", Some("2024-01-01"), Some("2024-01-02"))),
            None,
            Some(record("now", Some("2025-06-14"), Some("2025-06-16"))),
            Some(record("recent", Some("2025-05-01"), Some("2025-05-03"))),
            Some(record("later", Some("2020-01-01"), None)),
            Some(record("undated", None, None)),
        ];

        let view = build_dashboard(records, &now());

        assert_eq!(ids(&view.upcoming), ["now", "later"]);
        assert_eq!(ids(&view.past), ["recent", "old"]);
        assert_eq!(view.ongoing, 1);
        assert_eq!(view.unclassified, 1);
    }

    #[test]
    fn card_carries_price_and_address() {
        let mut event = record("gala", Some("2025-07-01"), None);
        event.city = Some("Lyon".into());
        event.ticket_types = vec![TicketType {
            price: 45.0,
            is_active: true,
            ..Default::default()
        }];

        let card = event_card(&event, &now());

        assert_eq!(card.title, "GALA");
        assert_eq!(card.address, "Lyon");
        assert_eq!(card.price, PriceResult::Amount { value: 45.0 });
        assert!(!card.ongoing);
    }

    #[test]
    fn serializes_for_the_frontend() {
        let view = build_dashboard(vec![record("a", Some("2025-07-01"), None)], &now());
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["upcoming"][0]["startDate"], "2025-07-01");
        assert_eq!(value["upcoming"][0]["price"]["kind"], "free");
        assert_eq!(value["upcoming"][0]["address"], "Address not specified");
        assert_eq!(value["past"], serde_json::json!([]));
    }
}
